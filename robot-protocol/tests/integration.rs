//! Integration test: drives full sessions over a real loopback TCP socket,
//! exercising `drive_session` the same way `robot-server`'s accept loop
//! does.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use robot_protocol::{drive_session, SessionConfig};

fn frame(s: &str) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.push(0x07);
    v.push(0x08);
    v
}

fn spawn_session(config: SessionConfig) -> TcpStream {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        drive_session(&mut stream, config);
    });
    let client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    client
}

fn read_frame(client: &mut TcpStream) -> Vec<u8> {
    let mut payload = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        client.read_exact(&mut byte).unwrap();
        payload.push(byte[0]);
        if payload.len() >= 2 && payload[payload.len() - 2..] == [0x07, 0x08] {
            payload.truncate(payload.len() - 2);
            return payload;
        }
    }
}

#[test]
fn minimal_happy_path_reaches_origin_and_logs_out() {
    let mut client = spawn_session(SessionConfig::default());

    client.write_all(&frame("Oompa Loompa")).unwrap();
    assert_eq!(read_frame(&mut client), b"107 KEY REQUEST");

    client.write_all(&frame("2")).unwrap();
    assert_eq!(read_frame(&mut client), b"60677");

    client.write_all(&frame("55491")).unwrap();
    assert_eq!(read_frame(&mut client), b"200 OK");
    assert_eq!(read_frame(&mut client), b"102 MOVE");

    client.write_all(&frame("OK 0 0")).unwrap();
    assert_eq!(read_frame(&mut client), b"105 GET MESSAGE");

    client.write_all(&frame("the secret is in the sauce")).unwrap();
    assert_eq!(read_frame(&mut client), b"106 LOGOUT");
}

#[test]
fn key_out_of_range_is_reported_and_connection_closes() {
    let mut client = spawn_session(SessionConfig::default());

    client.write_all(&frame("Oompa Loompa")).unwrap();
    assert_eq!(read_frame(&mut client), b"107 KEY REQUEST");

    client.write_all(&frame("42")).unwrap();
    assert_eq!(read_frame(&mut client), b"303 KEY OUT OF RANGE");
}

#[test]
fn login_failure_is_reported_and_connection_closes() {
    let mut client = spawn_session(SessionConfig::default());

    client.write_all(&frame("Oompa Loompa")).unwrap();
    assert_eq!(read_frame(&mut client), b"107 KEY REQUEST");

    client.write_all(&frame("2")).unwrap();
    assert_eq!(read_frame(&mut client), b"60677");

    client.write_all(&frame("0")).unwrap();
    assert_eq!(read_frame(&mut client), b"300 LOGIN FAILED");
}

#[test]
fn obstacle_toggles_evasion_and_navigation_continues() {
    let mut client = spawn_session(SessionConfig::default());

    client.write_all(&frame("Oompa Loompa")).unwrap();
    read_frame(&mut client);
    client.write_all(&frame("2")).unwrap();
    read_frame(&mut client);
    client.write_all(&frame("55491")).unwrap();
    assert_eq!(read_frame(&mut client), b"200 OK");
    assert_eq!(read_frame(&mut client), b"102 MOVE");

    // First reported position, moving east.
    client.write_all(&frame("OK -3 2")).unwrap();
    assert_eq!(read_frame(&mut client), b"102 MOVE");

    // Robot reports no movement after MOVE: treated as hitting an obstacle.
    client.write_all(&frame("OK -3 2")).unwrap();
    assert_eq!(read_frame(&mut client), b"104 TURN RIGHT");

    // Evade consumes the post-turn position unconditionally.
    client.write_all(&frame("OK -3 2")).unwrap();
    assert_eq!(read_frame(&mut client), b"102 MOVE");
}

#[test]
fn recharge_interrupt_then_resume_is_silent() {
    let mut client = spawn_session(SessionConfig::default());

    client.write_all(&frame("Oompa Loompa")).unwrap();
    read_frame(&mut client);
    client.write_all(&frame("2")).unwrap();
    read_frame(&mut client);
    client.write_all(&frame("55491")).unwrap();
    assert_eq!(read_frame(&mut client), b"200 OK");
    assert_eq!(read_frame(&mut client), b"102 MOVE");

    client.write_all(&frame("RECHARGING")).unwrap();
    client.write_all(&frame("FULL POWER")).unwrap();

    // Resumes exactly where it left off: the next position frame is
    // dispatched by DefineLocation, same as if recharging never happened.
    client.write_all(&frame("OK 0 0")).unwrap();
    assert_eq!(read_frame(&mut client), b"105 GET MESSAGE");
}

#[test]
fn fractional_coordinate_after_move_is_a_syntax_error() {
    let mut client = spawn_session(SessionConfig::default());

    client.write_all(&frame("Oompa Loompa")).unwrap();
    read_frame(&mut client);
    client.write_all(&frame("2")).unwrap();
    read_frame(&mut client);
    client.write_all(&frame("55491")).unwrap();
    assert_eq!(read_frame(&mut client), b"200 OK");
    assert_eq!(read_frame(&mut client), b"102 MOVE");

    client.write_all(&frame("OK -3.5 2")).unwrap();
    assert_eq!(read_frame(&mut client), b"301 SYNTAX ERROR");
}
