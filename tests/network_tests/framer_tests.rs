//! Framer Tests
//!
//! These tests verify:
//! - Login banner handling
//! - Request line format
//! - Echo and prompt stripping
//! - The Connecting -> Open -> Closed lifecycle
//! - Replies whose echo does not match the request in flight

#[path = "../common/mod.rs"]
mod common;

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use common::{payload, FakeDevice, Response, PROMPT};
use dlcpro::network::{Framer, FramerState, StreamConnection};
use dlcpro::protocol::{Directive, ParameterName, Value};
use dlcpro::DlcError;

fn name(raw: &str) -> ParameterName {
    ParameterName::new(raw).unwrap()
}

// =============================================================================
// Handshake Tests
// =============================================================================

#[test]
fn test_open_consumes_banner() {
    let (device, log) = FakeDevice::new(|_| payload("1"));
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();

    assert_eq!(framer.state(), FramerState::Open);
    let reply = framer
        .request(Directive::ParamRef, Some(&name("uptime")), &[])
        .unwrap();
    assert_eq!(reply, b"1");
    assert_eq!(log.lines(), vec!["(param-ref 'uptime)"]);
}

#[test]
fn test_open_fails_without_banner() {
    let (device, log) = FakeDevice::with_banner("", |_| payload("1"));
    let result = Framer::open(device, PROMPT, "fake");

    assert!(matches!(result, Err(DlcError::Handshake(_))));
    // Never opened, so no quit is sent
    assert_eq!(log.quit_count(), 0);
}

// =============================================================================
// Exchange Tests
// =============================================================================

#[test]
fn test_send_formats_arguments() {
    let (device, log) = FakeDevice::new(|_| payload("()"));
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();

    let args = [Value::from("scan"), Value::Float(2.5), Value::Boolean(true)];
    framer
        .request(Directive::Exec, Some(&name("laser1:scan:start")), &args)
        .unwrap();

    assert_eq!(log.lines(), vec!["(exec 'laser1:scan:start \"scan\" 2.5 #t)"]);
}

#[test]
fn test_receive_joins_multi_line_reply() {
    let (device, _log) = FakeDevice::new(|_| payload("(1\n2\n3)"));
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();

    let reply = framer
        .request(Directive::ParamRef, Some(&name("table")), &[])
        .unwrap();
    assert_eq!(reply, b"(1\n2\n3)");
    assert_eq!(
        dlcpro::protocol::decode(&reply).unwrap(),
        Value::from(vec![1, 2, 3])
    );
}

#[test]
fn test_unsupported_argument_sends_nothing() {
    let (device, log) = FakeDevice::new(|_| payload("0"));
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();

    let result = framer.send(Directive::ParamSet, Some(&name("x")), &[Value::Float(f64::NAN)]);
    assert!(matches!(result, Err(DlcError::UnsupportedType(_))));
    assert!(log.lines().is_empty());
}

#[test]
fn test_timeout_propagates() {
    let (device, _log) = FakeDevice::new(|_| Response::Silence);
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();

    let result = framer.request(Directive::ParamRef, Some(&name("slow")), &[]);
    assert!(matches!(result, Err(DlcError::Timeout)));
    assert_eq!(framer.state(), FramerState::Open);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_is_idempotent() {
    let (device, log) = FakeDevice::new(|_| payload("1"));
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();

    framer.close();
    framer.close();
    drop(framer);

    assert_eq!(log.quit_count(), 1);
    assert!(log.is_closed());
}

#[test]
fn test_send_after_close_fails() {
    let (device, _log) = FakeDevice::new(|_| payload("1"));
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();
    framer.close();

    assert_eq!(framer.state(), FramerState::Closed);
    assert!(matches!(
        framer.send(Directive::ParamRef, Some(&name("x")), &[]),
        Err(DlcError::ConnectionClosed)
    ));
    assert!(matches!(framer.receive(), Err(DlcError::ConnectionClosed)));
}

#[test]
fn test_drop_sends_quit() {
    let (device, log) = FakeDevice::new(|_| payload("1"));
    {
        let _framer = Framer::open(device, PROMPT, "fake").unwrap();
    }
    assert_eq!(log.lines(), vec!["(quit)"]);
    assert!(log.is_closed());
}

#[test]
fn test_peer_hangup_closes_framer() {
    let (device, _log) = FakeDevice::new(|_| Response::Hangup);
    let mut framer = Framer::open(device, PROMPT, "fake").unwrap();

    let result = framer.request(Directive::ParamRef, Some(&name("x")), &[]);
    assert!(matches!(result, Err(DlcError::ConnectionClosed)));
    assert!(framer.is_closed());
}

// =============================================================================
// Desynchronization Tests
// =============================================================================

/// Stream whose reads follow a script; `None` is a read timeout
struct ScriptedStream {
    reads: VecDeque<Option<&'static [u8]>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            Some(Some(chunk)) => {
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
            Some(None) => Err(io::Error::new(io::ErrorKind::WouldBlock, "timed out")),
            None => Ok(0),
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_late_reply_is_reported_not_returned() {
    let stream = ScriptedStream {
        reads: VecDeque::from(vec![
            Some(&b"DeCoF Command Line\r\n> "[..]),
            None,
            Some(&b"(param-ref 'a)\r\n111\r\n> "[..]),
            Some(&b"(param-ref 'b)\r\n222\r\n> "[..]),
        ]),
    };
    let mut framer = Framer::open(StreamConnection::new(stream), PROMPT, "fake").unwrap();

    let result = framer.request(Directive::ParamRef, Some(&name("a")), &[]);
    assert!(matches!(result, Err(DlcError::Timeout)));

    let result = framer.request(Directive::ParamRef, Some(&name("b")), &[]);
    match result {
        Err(DlcError::Desynchronized { expected, got }) => {
            assert_eq!(expected, "(param-ref 'b)");
            assert_eq!(got, "(param-ref 'a)");
        }
        other => panic!("expected desynchronization, got {:?}", other),
    }
    assert!(framer.is_closed());
}

#[test]
fn test_matching_echo_after_timeout_succeeds() {
    let stream = ScriptedStream {
        reads: VecDeque::from(vec![
            Some(&b"DeCoF Command Line\r\n> "[..]),
            None,
            Some(&b"(param-ref 'a)\r\n111\r\n> "[..]),
        ]),
    };
    let mut framer = Framer::open(StreamConnection::new(stream), PROMPT, "fake").unwrap();

    // A slow reply is still the answer to the request in flight
    assert!(matches!(
        framer.request(Directive::ParamRef, Some(&name("a")), &[]),
        Err(DlcError::Timeout)
    ));
    assert_eq!(framer.receive().unwrap(), b"111");
}
