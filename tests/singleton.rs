//! A second Farm constructed after a first, successfully-used one rejects
//! every operation with `NotSingleton`. Kept to a single `#[test]`
//! function: `Farm::new`'s singleton flag is a process-wide static, so
//! running two independent singleton assertions as separate tests in the
//! same binary would race against Rust's default parallel test execution.

mod common;

use modbus_farm::{ErrorCode, FarmError};

#[test]
fn second_farm_rejects_all_operations() {
    let farm1 = modbus_farm::Farm::new();
    assert!(farm1.is_singleton());

    let port = farm1
        .add_port(Box::new(common::StubSlave::new(1)))
        .expect("add_port on the singleton must succeed");
    let station = farm1
        .add_station(port, 1)
        .expect("add_station on the singleton must succeed");
    // A fresh station has never been polled: not_ready is the correct,
    // non-error steady state, proving the call went through normally.
    assert_eq!(farm1.query(station, 0), Err(FarmError::NotReady));

    let farm2 = modbus_farm::Farm::new();
    assert!(!farm2.is_singleton());
    assert_eq!(farm2.query(station, 0), Err(FarmError::NotSingleton));
    assert_eq!(
        farm2.query(station, 0).unwrap_err().code(),
        ErrorCode::NotSingleton
    );
    assert_eq!(farm2.write(station, 0, 1), Some(FarmError::NotSingleton));
    assert_eq!(
        farm2.add_station(port, 1),
        Err(FarmError::NotSingleton)
    );
}
