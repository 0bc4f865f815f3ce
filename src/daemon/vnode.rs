//! Virtual node stub — accepts a connection and holds it open until the
//! peer goes away.

use std::io;
use std::os::unix::net::UnixStream;
use tracing::debug;

use super::server::ConnectionHandler;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct VNodeHandler;

impl ConnectionHandler for VNodeHandler {
    fn handle(&self, mut stream: UnixStream) -> Result<()> {
        let drained = io::copy(&mut stream, &mut io::sink())?;
        debug!(bytes = drained, "vnode peer disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::Shutdown;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_holds_connection_until_peer_closes() {
        let (mut client, server) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || VNodeHandler.handle(server));

        client.write_all(b"ping").unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        client.shutdown(Shutdown::Write).unwrap();
        handle.join().unwrap().unwrap();
    }
}
