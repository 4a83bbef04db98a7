// Client tests against a real minirpc server, plus hand-rolled servers that
// misbehave on purpose.

use minirpc_client::RpcClient;
use minirpc_common::protocol::{MiniRpcError, RemoteErrorKind};
use minirpc_common::transport::{read_frame, write_frame};
use minirpc_server::{CallArgs, CallError, RpcServer, ServerConfig, ShutdownHandle};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::{SocketAddr, TcpListener};
use std::thread;

// ============================================================================
// Test Helpers
// ============================================================================

struct TestServer {
    addr: SocketAddr,
    handle: ShutdownHandle,
    thread: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(ServerConfig::new("127.0.0.1:0"))
    }

    fn start_with(config: ServerConfig) -> Self {
        let mut server = RpcServer::bind(config).unwrap();
        server
            .register("add", |args: CallArgs| {
                let a: i64 = args.arg(0)?;
                let b: i64 = args.arg(1)?;
                Ok(json!(a + b))
            })
            .register("boom", |_args: CallArgs| Err(CallError::runtime("boom")))
            .register("divide", |args: CallArgs| {
                let a: f64 = args.arg(0)?;
                let b: f64 = args.arg(1)?;
                if b == 0.0 {
                    return Err(CallError::new("ZeroDivisionError", "division by zero"));
                }
                Ok(json!(a / b))
            })
            .register("len", |args: CallArgs| {
                let text: String = args.arg(0)?;
                Ok(json!(text.len()))
            })
            .register("point", |args: CallArgs| {
                let x: i64 = args.param(0, "x")?;
                let y: i64 = args.param(1, "y")?;
                Ok(json!({"x": x, "y": y}))
            });

        let addr = server.local_addr();
        let handle = server.shutdown_handle();
        let thread = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            handle,
            thread: Some(thread),
        }
    }

    fn client(&self) -> RpcClient {
        RpcClient::connect_to(self.addr.to_string())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

/// A server that reads one request and answers with `reply` as a raw frame
fn start_raw_server(reply: Option<&'static [u8]>) -> (SocketAddr, thread::JoinHandle<()>) {
    start_raw_server_with(reply.map(<[u8]>::to_vec))
}

fn start_raw_server_with(reply: Option<Vec<u8>>) -> (SocketAddr, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let thread = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_frame(&mut stream).unwrap();
        if let Some(reply) = reply {
            // The client may hang up early on an oversized reply.
            let _ = write_frame(&mut stream, &reply);
        }
    });
    (addr, thread)
}

// ============================================================================
// Result Tests
// ============================================================================

#[test]
fn test_call_add() {
    let server = TestServer::start();
    let result = server.client().call_positional("add", vec![json!(2), json!(3)]).unwrap();
    assert_eq!(result, json!(5));
}

#[test]
fn test_typed_call() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    let server = TestServer::start();
    let client = server.client();

    let sum: i64 = client.method("add").arg(40).arg(2).invoke().unwrap();
    assert_eq!(sum, 42);

    let point: Point = client.method("point").arg(1).kwarg("y", 2).invoke().unwrap();
    assert_eq!(point, Point { x: 1, y: 2 });
}

#[test]
fn test_typed_call_wrong_shape_is_invalid_response() {
    let server = TestServer::start();
    let err = server
        .client()
        .method("add")
        .arg(1)
        .arg(2)
        .invoke::<String>()
        .unwrap_err();
    assert!(matches!(err, MiniRpcError::InvalidResponse(_)));
}

#[test]
fn test_concurrent_clients_are_served_in_turn() {
    let server = TestServer::start();
    let client = server.client();

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            thread::spawn(move || client.method("add").arg(i).arg(i).invoke::<i64>().unwrap())
        })
        .collect();

    let mut results: Vec<i64> = threads.into_iter().map(|t| t.join().unwrap()).collect();
    results.sort_unstable();
    assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
}

// ============================================================================
// Remote Error Tests
// ============================================================================

#[test]
fn test_unknown_method_is_remote_key_error() {
    let server = TestServer::start();
    let err = server.client().call_positional("mul", vec![]).unwrap_err();

    match err {
        MiniRpcError::Remote { kind, message } => {
            assert_eq!(kind, RemoteErrorKind::Key);
            assert!(message.contains("mul"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[test]
fn test_callable_failure_is_remote_error() {
    let server = TestServer::start();
    let client = server.client();

    let err = client.call_positional("boom", vec![]).unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.to_string(), "RuntimeError: boom");

    // The server keeps serving after a failure.
    assert_eq!(client.call_positional("add", vec![json!(1), json!(2)]).unwrap(), json!(3));
}

#[test]
fn test_unrecognized_kind_is_kept() {
    let server = TestServer::start();
    let err = server
        .client()
        .call_positional("divide", vec![json!(1), json!(0)])
        .unwrap_err();

    match err {
        MiniRpcError::Remote { kind, message } => {
            assert_eq!(kind, RemoteErrorKind::Other("ZeroDivisionError".to_string()));
            assert_eq!(message, "division by zero");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[test]
fn test_bad_argument_is_remote_type_error() {
    let server = TestServer::start();
    let err = server.client().method("add").arg("two").arg(3).invoke_value().unwrap_err();
    assert!(matches!(err, MiniRpcError::Remote { kind: RemoteErrorKind::Type, .. }));
}

// ============================================================================
// Protocol and Transport Error Tests
// ============================================================================

#[test]
fn test_garbage_reply_is_invalid_response() {
    let (addr, thread) = start_raw_server(Some(b"definitely not json"));
    let err = RpcClient::connect_to(addr.to_string())
        .call_positional("add", vec![])
        .unwrap_err();
    thread.join().unwrap();

    assert!(matches!(err, MiniRpcError::InvalidResponse(_)));
    assert!(!err.is_remote());
    assert!(!err.is_transport());
}

#[test]
fn test_unknown_reply_type_is_invalid_response() {
    let (addr, thread) = start_raw_server(Some(br#"{"type": "maybe", "content": 1}"#));
    let err = RpcClient::connect_to(addr.to_string())
        .call_positional("add", vec![])
        .unwrap_err();
    thread.join().unwrap();

    assert!(matches!(err, MiniRpcError::InvalidResponse(_)));
}

#[test]
fn test_server_hangup_is_transport_error() {
    let (addr, thread) = start_raw_server(None);
    let err = RpcClient::connect_to(addr.to_string())
        .call_positional("add", vec![])
        .unwrap_err();
    thread.join().unwrap();

    assert!(matches!(err, MiniRpcError::ShortRead { received: 0, .. }));
    assert!(err.is_transport());
}

#[test]
fn test_oversized_request_is_remote_value_error() {
    let server = TestServer::start_with(ServerConfig::new("127.0.0.1:0").with_max_message_size(1024));
    let client = server.client();

    for size in [4 * 1024, 64 * 1024, 4 * 1024 * 1024] {
        let err = client
            .call_positional("len", vec![json!("x".repeat(size))])
            .unwrap_err();
        match err {
            MiniRpcError::Remote { kind, message } => {
                assert_eq!(kind, RemoteErrorKind::Value, "size {}", size);
                assert!(message.contains("Message too large"), "size {}: {}", size, message);
            }
            other => panic!("size {}: expected remote error, got {:?}", size, other),
        }
    }

    // Within the bound the same method works.
    assert_eq!(client.call_positional("len", vec![json!("abc")]).unwrap(), json!(3));
}

#[test]
fn test_response_bound_is_enforced() {
    let reply = format!(r#"{{"type": "result", "content": "{}"}}"#, "y".repeat(4096));
    let (addr, thread) = start_raw_server_with(Some(reply.into_bytes()));

    let err = RpcClient::connect_to(addr.to_string())
        .with_max_message_size(256)
        .call_positional("big", vec![])
        .unwrap_err();
    thread.join().unwrap();

    assert!(
        matches!(err, MiniRpcError::MessageTooLarge { max: 256, .. }),
        "unexpected error: {:?}",
        err
    );
    assert!(err.is_transport());
}

#[test]
fn test_result_may_be_null() {
    let (addr, thread) = start_raw_server(Some(br#"{"type": "result", "content": null}"#));
    let result = RpcClient::connect_to(addr.to_string())
        .call_positional("nothing", vec![])
        .unwrap();
    thread.join().unwrap();

    assert_eq!(result, Value::Null);
}
