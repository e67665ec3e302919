//! After a write completes and at least one polling cycle has elapsed, a
//! query returns the written value, against a faithful loopback slave.

mod common;

use std::time::Duration;

#[test]
fn write_then_query_round_trips() {
    let farm = modbus_farm::Farm::new();
    let port = farm.add_port(Box::new(common::StubSlave::new(7))).unwrap();
    let station = farm.add_station(port, 7).unwrap();

    // Establish the polled range before the first write so the polling
    // thread actually has something to poll.
    assert!(farm.query(station, 3).is_err());

    let previous = farm.write(station, 3, 42);
    assert_eq!(previous, None, "no prior write attempt: nothing to report yet");

    std::thread::sleep(Duration::from_millis(2500));

    assert_eq!(farm.query(station, 3), Ok(42));
    // A single-register query and a one-element block query must agree.
    assert_eq!(farm.query_block(station, 3, 1).unwrap(), vec![42]);

    farm.shutdown();
}
