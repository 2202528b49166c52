use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, Duration};

use kache::codec::{ProtocolError, MAX_ARGS};
use kache::config::Config;
use kache::connection::Connection;
use kache::frame::{Frame, Request};

/// Returns the peer socket and a `Connection` wrapping the other end of it.
async fn create_tcp_connection(config: &Config) -> Result<(TcpStream, Connection), std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    let peer = TcpStream::connect(local_addr).await?;
    let (stream, _) = listener.accept().await?;

    Ok((peer, Connection::new(stream, config)))
}

fn command(args: &[&str]) -> Request {
    Request(args.iter().map(|arg| Bytes::from(arg.to_string())).collect())
}

#[tokio::test]
async fn test_parse_command() {
    let (mut peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    peer.write_all(b"*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n")
        .await
        .unwrap();

    let actual = connection.read_request().await.unwrap();
    assert_eq!(actual, Some(command(&["SET", "mykey", "myvalue"])));
}

#[tokio::test]
async fn test_parse_multiple_commands_sequentially() {
    let (mut peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    peer.write_all(b"*3\r\n$3\r\nSET\r\n$7\r\nmykey_1\r\n$9\r\nmyvalue_1\r\n")
        .await
        .unwrap();
    peer.write_all(b"*2\r\n$3\r\nGET\r\n$7\r\nmykey_1\r\n*2\r\n$6\r\nDELETE\r\n$7\r\nmykey_1\r\n")
        .await
        .unwrap();

    let actual = connection.read_request().await.unwrap();
    assert_eq!(actual, Some(command(&["SET", "mykey_1", "myvalue_1"])));

    let actual = connection.read_request().await.unwrap();
    assert_eq!(actual, Some(command(&["GET", "mykey_1"])));

    let actual = connection.read_request().await.unwrap();
    assert_eq!(actual, Some(command(&["DELETE", "mykey_1"])));
}

#[tokio::test]
async fn test_parse_incomplete_frame() {
    let (mut peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    // "*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n" split in three writes.
    let part1 = b"*3\r\n$3\r\nSE";
    let part2 = b"T\r\n$5\r\nmyke";
    let part3 = b"y\r\n$7\r\nmyvalue\r\n";

    tokio::spawn(async move {
        for part in [&part1[..], &part2[..], &part3[..]] {
            peer.write_all(part).await.unwrap();
            // Simulate a delay in sending/receiving the data.
            sleep(Duration::from_millis(100)).await;
        }
    });

    let actual = connection.read_request().await.unwrap();
    assert_eq!(actual, Some(command(&["SET", "mykey", "myvalue"])));
}

#[tokio::test]
async fn test_clean_close() {
    let (peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    drop(peer);

    let actual = connection.read_request().await.unwrap();
    assert_eq!(actual, None);
}

#[tokio::test]
async fn test_close_mid_command() {
    let (mut peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    peer.write_all(b"*2\r\n$3\r\nGET\r\n$5\r\nmy").await.unwrap();
    drop(peer);

    let err = connection.read_request().await.unwrap_err();
    assert!(matches!(err, ProtocolError::UnexpectedEof));
}

#[tokio::test]
async fn test_invalid_marker() {
    let (mut peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    peer.write_all(b"GET mykey\r\n").await.unwrap();

    let err = connection.read_request().await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidDataType { expected: '*', .. }
    ));
}

#[tokio::test]
async fn test_bulk_limit_from_config() {
    let config = Config {
        max_bulk_len: 3,
        ..Config::default()
    };
    let (mut peer, mut connection) = create_tcp_connection(&config).await.unwrap();

    peer.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();

    let err = connection.read_request().await.unwrap_err();
    assert!(matches!(err, ProtocolError::BulkTooLarge { len: 4, max: 3 }));
}

#[tokio::test]
async fn test_argument_count_limit() {
    let (mut peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    peer.write_all(format!("*{}\r\n", MAX_ARGS + 1).as_bytes())
        .await
        .unwrap();

    let err = connection.read_request().await.unwrap_err();
    assert!(matches!(err, ProtocolError::TooManyArguments { .. }));
}

#[tokio::test]
async fn test_idle_timeout() {
    let config = Config {
        idle_timeout: 1,
        ..Config::default()
    };
    let (_peer, mut connection) = create_tcp_connection(&config).await.unwrap();

    let actual = connection.read_request().await.unwrap();
    assert_eq!(actual, None);
}

#[tokio::test]
async fn test_write_replies() {
    let (mut peer, mut connection) = create_tcp_connection(&Config::default()).await.unwrap();

    connection.write_frame(Frame::ok()).await.unwrap();
    connection
        .write_frame(Frame::Bulk(Bytes::from("hello world from kache")))
        .await
        .unwrap();
    connection.write_frame(Frame::Null).await.unwrap();
    connection.write_frame(Frame::Integer(1)).await.unwrap();
    drop(connection);

    let mut received = Vec::new();
    peer.read_to_end(&mut received).await.unwrap();

    assert_eq!(
        received,
        b"OK\nhello world from kache\n(nil)\n(integer) 1\n".to_vec()
    );
}
