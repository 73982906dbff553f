use std::{io, sync::Arc};
use tokio::net::TcpListener;
use web_socket_server::{server, Config, DataType, Peer};

fn echo(peer: &mut Peer, ty: DataType, data: &[u8]) {
    match ty {
        DataType::Text => {
            let msg = String::from_utf8_lossy(data);
            println!("[{}] {msg}", peer.id());
            peer.send(&*msg);
        }
        DataType::Binary => peer.send(data),
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let config = Arc::new(Config::new("chat"));
    let listener = TcpListener::bind("127.0.0.1:8080").await?;
    println!("Listening on: ws://{}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(err) = server::serve(stream, config, echo).await {
                println!("Addr: {addr}, {err}");
            }
        });
    }
}
