use std::{sync::Arc, time::Duration};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use web_socket_server::{handshake, message::encode_masked, server::serve, *};

const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

fn request(protocol: &str) -> String {
    format!(
        "GET /chat HTTP/1.1\r\n\
         Host: localhost\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {KEY}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Protocol: {protocol}\r\n\r\n"
    )
}

fn echo(peer: &mut Peer, ty: DataType, data: &[u8]) {
    match ty {
        DataType::Text => peer.send(String::from_utf8_lossy(data).into_owned()),
        DataType::Binary => peer.send(data),
    }
}

async fn read_n(client: &mut DuplexStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0; n];
    client.read_exact(&mut buf).await.unwrap();
    buf
}

async fn upgrade(client: &mut DuplexStream) {
    client.write_all(request("chat").as_bytes()).await.unwrap();
    let res = handshake::response(KEY, "chat");
    assert_eq!(read_n(client, res.len()).await, res.as_bytes());
}

#[tokio::test]
async fn echo_and_close() {
    let (mut client, server) = duplex(64 * 1024);
    let task = tokio::spawn(serve(server, Arc::new(Config::default()), echo));
    upgrade(&mut client).await;

    let mut bytes = vec![];
    encode_masked(&mut bytes, false, Opcode::Text, b"Hel");
    encode_masked(&mut bytes, true, Opcode::Ping, b"?");
    encode_masked(&mut bytes, true, Opcode::Continuation, b"lo");
    client.write_all(&bytes).await.unwrap();

    assert_eq!(read_n(&mut client, 3).await, [0x8a, 0x01, b'?']);
    assert_eq!(read_n(&mut client, 7).await, [0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);

    let mut bytes = vec![];
    encode_masked(&mut bytes, true, Opcode::Close, &[0x03, 0xe8]);
    client.write_all(&bytes).await.unwrap();
    assert_eq!(read_n(&mut client, 4).await, [0x88, 0x02, 0x03, 0xe8]);

    task.await.unwrap().unwrap();
    let mut rest = vec![];
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn rejected_handshake() {
    let (mut client, server) = duplex(64 * 1024);
    let task = tokio::spawn(serve(server, Arc::new(Config::default()), echo));

    client.write_all(request("superchat").as_bytes()).await.unwrap();
    let mut rest = vec![];
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    assert!(matches!(task.await.unwrap(), Err(Error::UnsupportedSubprotocol)));
}

#[tokio::test]
async fn protocol_error_sends_close() {
    let (mut client, server) = duplex(64 * 1024);
    let task = tokio::spawn(serve(server, Arc::new(Config::default()), echo));
    upgrade(&mut client).await;

    // Unmasked client frame.
    client.write_all(&[0x81, 0x02, b'H', b'i']).await.unwrap();
    assert_eq!(read_n(&mut client, 4).await, [0x88, 0x02, 0x03, 0xea]);
    assert!(matches!(task.await.unwrap(), Err(Error::ProtocolViolation(_))));
}

#[tokio::test]
async fn client_goes_away() {
    let (mut client, server) = duplex(64 * 1024);
    let task = tokio::spawn(serve(server, Arc::new(Config::default()), echo));
    upgrade(&mut client).await;
    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn unanswered_ping() {
    let config = Config {
        ping_interval: Some(Duration::from_secs(1)),
        pong_wait: Duration::from_secs(2),
        ..Config::default()
    };
    let (mut client, server) = duplex(64 * 1024);
    let task = tokio::spawn(serve(server, Arc::new(config), echo));
    upgrade(&mut client).await;

    assert_eq!(read_n(&mut client, 2).await, [0x89, 0x00]);
    assert!(matches!(task.await.unwrap(), Err(Error::PongTimeout(_))));
    assert_eq!(read_n(&mut client, 4).await, [0x88, 0x02, 0x03, 0xf0]);
}

#[tokio::test(start_paused = true)]
async fn answered_ping() {
    let config = Config {
        ping_interval: Some(Duration::from_secs(1)),
        pong_wait: Duration::from_secs(2),
        ..Config::default()
    };
    let (mut client, server) = duplex(64 * 1024);
    let task = tokio::spawn(serve(server, Arc::new(config), echo));
    upgrade(&mut client).await;

    for _ in 0..3 {
        assert_eq!(read_n(&mut client, 2).await, [0x89, 0x00]);
        let mut pong = vec![];
        encode_masked(&mut pong, true, Opcode::Pong, b"");
        client.write_all(&pong).await.unwrap();
    }
    let mut bytes = vec![];
    encode_masked(&mut bytes, true, Opcode::Close, &[]);
    client.write_all(&bytes).await.unwrap();
    assert_eq!(read_n(&mut client, 2).await, [0x88, 0x00]);
    task.await.unwrap().unwrap();
}
