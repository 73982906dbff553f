use std::{
    io,
    net::{TcpListener, TcpStream},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use web_socket_server::{Config, Connection, DataType, Peer};

fn echo(peer: &mut Peer, ty: DataType, data: &[u8]) {
    println!("[{}] {ty:?}: {} bytes", peer.id(), data.len());
    peer.send(data);
}

fn process(mut stream: TcpStream, config: Arc<Config>) -> web_socket_server::Result<()> {
    stream.set_nonblocking(true)?;
    let mut buf = vec![0; config.read_buffer_size];
    let mut conn = Connection::new(config);
    let mut handler = echo;

    while !conn.is_closed() {
        conn.on_ready(&mut stream, &mut buf, Instant::now(), &mut handler)?;
        thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let mut config = Config::new("chat");
    config.ping_interval = Some(Duration::from_secs(20));
    let config = Arc::new(config);

    let listener = TcpListener::bind("127.0.0.1:8080")?;
    println!("Listening on: ws://{}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept()?;
        let config = config.clone();
        thread::spawn(move || {
            if let Err(err) = process(stream, config) {
                println!("Addr: {addr}, {err}");
            }
        });
    }
}
