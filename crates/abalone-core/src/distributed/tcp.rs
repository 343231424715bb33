//! TCP links for running workers as separate processes.
//!
//! Frames travel as a little-endian `u32` length followed by the frame bytes.
//! Each connection gets a reader thread that forwards complete frames into a
//! channel, so polling for messages never blocks on the socket.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use log::{debug, info};

use crate::distributed::transport::{CoordinatorLink, Incoming, WorkerLink};
use crate::error::{Error, Result};

/// Frames longer than this are rejected.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Writes one length-prefixed frame.
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(Error::Protocol(format!(
            "frame of {} bytes exceeds {MAX_FRAME_LEN}",
            frame.len()
        )));
    }
    writer.write_u32::<LittleEndian>(frame.len() as u32)?;
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

/// Reads one length-prefixed frame.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::Protocol(format!("frame length {len} exceeds {MAX_FRAME_LEN}")));
    }
    let mut frame = vec![0; len];
    reader.read_exact(&mut frame)?;
    Ok(frame)
}

fn spawn_reader<T, F>(name: String, mut stream: TcpStream, tx: Sender<T>, wrap: F) -> Result<()>
where
    T: Send + 'static,
    F: Fn(Vec<u8>) -> T + Send + 'static,
{
    thread::Builder::new().name(name.clone()).spawn(move || {
        loop {
            match read_frame(&mut stream) {
                Ok(frame) => {
                    if tx.send(wrap(frame)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!("{name} stopped: {err}");
                    break;
                }
            }
        }
    })?;
    Ok(())
}

/// Coordinator end of a set of TCP worker connections.
pub struct TcpCoordinatorLink {
    streams: Vec<TcpStream>,
    inbox: Receiver<Incoming>,
}

impl TcpCoordinatorLink {
    /// Accepts exactly `n_workers` connections on `listener`. Worker ids follow
    /// connection order.
    pub fn accept(listener: &TcpListener, n_workers: usize) -> Result<Self> {
        let (tx, inbox) = unbounded();
        let mut streams = Vec::with_capacity(n_workers);
        for id in 0..n_workers {
            let (stream, peer) = listener.accept()?;
            stream.set_nodelay(true)?;
            info!("worker {id} connected from {peer}");
            spawn_reader(
                format!("worker-{id}-reader"),
                stream.try_clone()?,
                tx.clone(),
                move |frame| (id, frame),
            )?;
            streams.push(stream);
        }
        Ok(TcpCoordinatorLink { streams, inbox })
    }
}

impl Drop for TcpCoordinatorLink {
    fn drop(&mut self) {
        for stream in &self.streams {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl CoordinatorLink for TcpCoordinatorLink {
    fn worker_count(&self) -> usize {
        self.streams.len()
    }

    fn send(&mut self, worker: usize, frame: Vec<u8>) -> Result<()> {
        let stream = self
            .streams
            .get_mut(worker)
            .ok_or_else(|| Error::Config(format!("no worker {worker}")))?;
        write_frame(stream, &frame)
    }

    fn try_recv(&mut self) -> Result<Option<Incoming>> {
        match self.inbox.try_recv() {
            Ok(incoming) => Ok(Some(incoming)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        }
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Incoming>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(incoming) => Ok(Some(incoming)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Disconnected),
        }
    }
}

/// Worker end of a TCP connection to the coordinator.
pub struct TcpWorkerLink {
    stream: TcpStream,
    inbox: Receiver<Vec<u8>>,
}

impl TcpWorkerLink {
    /// Connects to a coordinator listening on `addr`.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let (tx, inbox) = unbounded();
        spawn_reader(
            "coordinator-reader".to_string(),
            stream.try_clone()?,
            tx,
            |frame| frame,
        )?;
        Ok(TcpWorkerLink { stream, inbox })
    }
}

impl Drop for TcpWorkerLink {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl WorkerLink for TcpWorkerLink {
    fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        write_frame(&mut self.stream, &frame)
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        self.inbox.recv().map_err(|_| Error::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.inbox.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_round_trip_over_buffer() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &[4, 5, 6]).unwrap();
        write_frame(&mut buffer, &[]).unwrap();
        assert_eq!(&buffer[..4], &3u32.to_le_bytes());
        let mut reader = buffer.as_slice();
        assert_eq!(read_frame(&mut reader).unwrap(), vec![4, 5, 6]);
        assert_eq!(read_frame(&mut reader).unwrap(), Vec::<u8>::new());
        assert!(read_frame(&mut reader).is_err());
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&(MAX_FRAME_LEN as u32 + 1).to_le_bytes());
        assert!(matches!(
            read_frame(&mut buffer.as_slice()),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_loopback_link() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || {
            let mut link = TcpWorkerLink::connect(addr).unwrap();
            link.send(vec![1]).unwrap();
            link.recv().unwrap()
        });
        let mut coordinator = TcpCoordinatorLink::accept(&listener, 1).unwrap();
        let (from, frame) = coordinator
            .recv_timeout(Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert_eq!((from, frame), (0, vec![1]));
        coordinator.send(0, vec![9, 9]).unwrap();
        assert_eq!(client.join().unwrap(), vec![9, 9]);
    }
}
