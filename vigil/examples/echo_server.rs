//! Example: TCP echo server driven by the reactor

use std::cell::Cell;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;

use vigil::{
    Connection, NonfatalExt, PollError, RawHandle, Reactor, ReactorHandle, Readiness, Token,
    raw_handle,
};

struct Listener(TcpListener);

impl Connection for Listener {
    fn handle(&self) -> RawHandle {
        raw_handle(&self.0)
    }

    fn poll(&mut self, _ready: Readiness, reactor: &ReactorHandle) -> Result<(), PollError> {
        let (stream, addr) = match self.0.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(PollError::nonfatal(e)),
        };

        println!("Accepted connection from {}", addr);
        stream.set_nonblocking(true)?;
        let token = Rc::new(Cell::new(None));
        let registered = reactor
            .add_connection(Client {
                stream,
                token: token.clone(),
            })
            .map_err(PollError::fatal)?;
        token.set(Some(registered));

        Ok(())
    }
}

// Echo handler: reads data and writes it back to the client
struct Client {
    stream: TcpStream,
    token: Rc<Cell<Option<Token>>>,
}

impl Connection for Client {
    fn handle(&self) -> RawHandle {
        raw_handle(&self.stream)
    }

    fn poll(&mut self, _ready: Readiness, reactor: &ReactorHandle) -> Result<(), PollError> {
        let mut buf = [0u8; 1024];
        let n = match self.stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(PollError::nonfatal(e)),
        };

        if n == 0 {
            // peer hung up
            if let Some(token) = self.token.take() {
                reactor.remove(token).map_err(PollError::fatal)?;
            }
            return Ok(());
        }

        self.stream.write_all(&buf[..n]).nonfatal()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Bind a TCP echo server to localhost:9000
    let listener = TcpListener::bind("127.0.0.1:9000")?;
    listener.set_nonblocking(true)?;
    println!("Echo server listening on 127.0.0.1:9000");

    let mut reactor = Reactor::new();
    reactor.add_connection(Listener(listener))?;
    reactor.run()?;

    Ok(())
}
