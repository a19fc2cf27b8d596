//! Contains code pertaining to the FTP *data* channel: one task per data
//! connection, executing at most one transfer, with ASCII line-ending
//! translation, bandwidth throttling, a stall watchdog and an optional
//! sendfile fast path.

use crate::server::chancomms::{ControlChanMsg, DataCommand, SendSource};
use crate::server::io::FtpStream;
use crate::server::session::TransferType;

use slog::{debug, warn};
use std::{
    io,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    sync::mpsc::{Receiver, Sender},
    time::Instant,
};

const CHUNK_SIZE: usize = 65536;

// Translates host line endings to CRLF for outbound ASCII transfers. A CRLF
// already present in the input passes through, even when the CR and the LF
// arrive in different chunks.
#[derive(Debug, Default)]
pub(crate) struct AsciiToCrlf {
    prev_chunk_ended_with_cr: bool,
}

impl AsciiToCrlf {
    pub(crate) fn translate(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(chunk.len() + chunk.len() / 8);
        let mut prev_was_cr = self.prev_chunk_ended_with_cr;
        for &byte in chunk {
            if byte == b'\n' && !prev_was_cr {
                out.push(b'\r');
            }
            out.push(byte);
            prev_was_cr = byte == b'\r';
        }
        self.prev_chunk_ended_with_cr = prev_was_cr;
        out
    }
}

// Translates CRLF to the host line ending for inbound ASCII transfers. A CR
// at the end of a chunk is deferred: it may be the first half of a CRLF that
// continues in the next chunk.
#[derive(Debug, Default)]
pub(crate) struct CrlfToAscii {
    had_cr: bool,
}

impl CrlfToAscii {
    pub(crate) fn translate(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut input = Vec::with_capacity(chunk.len() + 1);
        if self.had_cr {
            input.push(b'\r');
        }
        input.extend_from_slice(chunk);
        self.had_cr = input.last() == Some(&b'\r');
        if self.had_cr {
            input.pop();
        }
        let mut out = Vec::with_capacity(input.len());
        let mut iter = input.iter().peekable();
        while let Some(&byte) = iter.next() {
            if byte == b'\r' && iter.peek() == Some(&&b'\n') {
                continue;
            }
            out.push(byte);
        }
        out
    }

    // Flushes a CR that turned out not to be part of a CRLF pair.
    pub(crate) fn finish(&mut self) -> Vec<u8> {
        if std::mem::take(&mut self.had_cr) { vec![b'\r'] } else { Vec::new() }
    }
}

// Counts transmitted bytes so that a channel bursts to no more than the
// configured bytes-per-second average. When the budget for the current
// second is used up the task sleeps, which suspends the transfer loop.
#[derive(Debug)]
pub(crate) struct SpeedLimiter {
    limit: u64,
    count: u64,
    next_reset: Instant,
}

impl SpeedLimiter {
    pub(crate) fn new(limit: u64) -> Self {
        SpeedLimiter {
            limit,
            count: 0,
            next_reset: Instant::now() + Duration::from_secs(1),
        }
    }

    pub(crate) fn is_off(&self) -> bool {
        self.limit == 0
    }

    pub(crate) async fn throttle(&mut self, transferred: usize) {
        if self.limit == 0 {
            return;
        }
        self.count += transferred as u64;
        if self.count >= self.limit {
            self.count = 0;
            let now = Instant::now();
            let sleep_for = self.next_reset.saturating_duration_since(now) * 2;
            if !sleep_for.is_zero() {
                tokio::time::sleep(sleep_for).await;
            }
            self.next_reset = now + Duration::from_secs(1);
        }
    }
}

// Everything the data channel task needs besides the connection itself.
pub(crate) struct DataChannel {
    pub logger: slog::Logger,
    pub msg_tx: Sender<ControlChanMsg>,
    pub bytes_counter: Arc<AtomicU64>,
    pub stall_timeout: Duration,
    pub read_limit: u64,
    pub write_limit: u64,
    pub use_sendfile: bool,
}

enum Outcome {
    Done(io::Result<u64>),
    Stalled,
    Aborted,
}

impl DataChannel {
    // Waits for the one transfer command of this connection and executes it.
    // The control loop replaces the whole channel for the next transfer.
    pub(crate) async fn run(self, mut stream: FtpStream, mut cmd_rx: Receiver<DataCommand>, mut abort_rx: Receiver<()>) {
        let cmd = tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => cmd,
                // The control connection went away before a transfer started.
                None => return,
            },
            _ = abort_rx.recv() => {
                let _ = stream.shutdown().await;
                return;
            }
        };

        match cmd {
            DataCommand::Send { source, ftp_path, transfer_type } => {
                self.send(stream, abort_rx, source, ftp_path, transfer_type).await;
            }
            DataCommand::Receive { file, ftp_path, transfer_type } => {
                self.receive(stream, abort_rx, file, ftp_path, transfer_type).await;
            }
        }
    }

    async fn send(self, mut stream: FtpStream, mut abort_rx: Receiver<()>, source: SendSource, ftp_path: Option<String>, transfer_type: TransferType) {
        let counter = Arc::clone(&self.bytes_counter);
        counter.store(0, Ordering::Relaxed);
        let mut limiter = SpeedLimiter::new(self.write_limit);
        let use_sendfile = self.use_sendfile && limiter.is_off();

        let outcome = {
            let pump = pump_send(&mut stream, source, transfer_type, &mut limiter, &counter, use_sendfile);
            tokio::pin!(pump);
            self.drive(pump, &mut abort_rx, &counter).await
        };
        self.finish(stream, outcome, ftp_path, false).await;
    }

    async fn receive(self, mut stream: FtpStream, mut abort_rx: Receiver<()>, mut file: tokio::fs::File, ftp_path: String, transfer_type: TransferType) {
        let counter = Arc::clone(&self.bytes_counter);
        counter.store(0, Ordering::Relaxed);
        let mut limiter = SpeedLimiter::new(self.read_limit);

        let outcome = {
            let pump = pump_receive(&mut stream, &mut file, transfer_type, &mut limiter, &counter);
            tokio::pin!(pump);
            self.drive(pump, &mut abort_rx, &counter).await
        };
        drop(file);
        self.finish(stream, outcome, Some(ftp_path), true).await;
    }

    // Runs the transfer future against the abort signal and the stall
    // watchdog. The watchdog fires every stall_timeout; equal byte counts on
    // two consecutive ticks mean no progress at all for a full period.
    async fn drive<F>(&self, mut pump: Pin<&mut F>, abort_rx: &mut Receiver<()>, counter: &Arc<AtomicU64>) -> Outcome
    where
        F: Future<Output = io::Result<u64>>,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.stall_timeout, self.stall_timeout);
        let mut last_tick_bytes = 0u64;
        loop {
            tokio::select! {
                result = &mut pump => return Outcome::Done(result),
                _ = abort_rx.recv() => return Outcome::Aborted,
                _ = ticker.tick() => {
                    let transmitted = counter.load(Ordering::Relaxed);
                    if transmitted == last_tick_bytes {
                        return Outcome::Stalled;
                    }
                    last_tick_bytes = transmitted;
                }
            }
        }
    }

    // RFC 959 requires the data connection to be closed before the final
    // status reply, so the stream is shut down and dropped before any message
    // goes back to the control loop.
    async fn finish(self, mut stream: FtpStream, outcome: Outcome, ftp_path: Option<String>, receiving: bool) {
        let bytes = self.bytes_counter.load(Ordering::Relaxed);
        let msg = match outcome {
            Outcome::Done(Ok(bytes)) => {
                let _ = stream.shutdown().await;
                drop(stream);
                match (ftp_path, receiving) {
                    (Some(path), true) => ControlChanMsg::ReceivedData { path, bytes },
                    (Some(path), false) => ControlChanMsg::SentData { path, bytes },
                    (None, _) => ControlChanMsg::DirectoryListed,
                }
            }
            Outcome::Done(Err(err)) => {
                debug!(self.logger, "Transfer failed: {:?}", err);
                let _ = stream.shutdown().await;
                drop(stream);
                ControlChanMsg::TransferAborted { path: ftp_path, bytes, receiving }
            }
            Outcome::Stalled => {
                drop(stream);
                ControlChanMsg::DataStalled
            }
            Outcome::Aborted => {
                let _ = stream.shutdown().await;
                drop(stream);
                ControlChanMsg::AbortedByClient { path: ftp_path, bytes, receiving }
            }
        };
        if let Err(err) = self.msg_tx.send(msg).await {
            warn!(self.logger, "Control loop gone before transfer result could be delivered: {}", err);
        }
    }
}

async fn pump_send(
    stream: &mut FtpStream,
    source: SendSource,
    transfer_type: TransferType,
    limiter: &mut SpeedLimiter,
    counter: &Arc<AtomicU64>,
    use_sendfile: bool,
) -> io::Result<u64> {
    let translate = transfer_type == TransferType::Ascii && cfg!(not(windows));
    let mut total = 0u64;

    let mut reader: Box<dyn AsyncRead + Send + Unpin> = match source {
        SendSource::File(mut file) => {
            #[cfg(target_os = "linux")]
            if use_sendfile && transfer_type == TransferType::Image {
                if let FtpStream::Plain(sock) = &*stream {
                    match sendfile::copy(&mut file, sock, counter).await? {
                        sendfile::Outcome::Done(sent) => return Ok(sent),
                        // Zero-progress failure on the first call: quietly
                        // continue with the buffered path below.
                        sendfile::Outcome::FallBack => {}
                    }
                }
            }
            #[cfg(not(target_os = "linux"))]
            let _ = use_sendfile;
            Box::new(file)
        }
        SendSource::Reader(reader) => reader,
    };

    let mut wrapper = AsciiToCrlf::default();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        if translate {
            let translated = wrapper.translate(&buffer[..n]);
            stream.write_all(&translated).await?;
        } else {
            stream.write_all(&buffer[..n]).await?;
        }
        total += n as u64;
        counter.fetch_add(n as u64, Ordering::Relaxed);
        limiter.throttle(n).await;
    }
    stream.flush().await?;
    Ok(total)
}

async fn pump_receive(
    stream: &mut FtpStream,
    file: &mut tokio::fs::File,
    transfer_type: TransferType,
    limiter: &mut SpeedLimiter,
    counter: &Arc<AtomicU64>,
) -> io::Result<u64> {
    let translate = transfer_type == TransferType::Ascii && cfg!(not(windows));
    let mut wrapper = CrlfToAscii::default();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        if translate {
            let translated = wrapper.translate(&buffer[..n]);
            file.write_all(&translated).await?;
        } else {
            file.write_all(&buffer[..n]).await?;
        }
        total += n as u64;
        counter.fetch_add(n as u64, Ordering::Relaxed);
        limiter.throttle(n).await;
    }
    if translate {
        let tail = wrapper.finish();
        if !tail.is_empty() {
            file.write_all(&tail).await?;
        }
    }
    file.flush().await?;
    Ok(total)
}

#[cfg(target_os = "linux")]
mod sendfile {
    //! Kernel zero-copy for plain binary downloads.

    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::io::{AsyncSeekExt, Interest};
    use tokio::net::TcpStream;

    const SENDFILE_CHUNK: usize = super::CHUNK_SIZE;

    pub(super) enum Outcome {
        Done(u64),
        FallBack,
    }

    pub(super) async fn copy(file: &mut tokio::fs::File, sock: &TcpStream, counter: &Arc<AtomicU64>) -> io::Result<Outcome> {
        // sendfile takes an explicit offset and leaves the descriptor's file
        // position alone, so a fallback can resume from the original seek.
        let mut offset = file.stream_position().await? as i64;
        let std_file = file.try_clone().await?.into_std().await;
        let mut total = 0u64;
        loop {
            sock.writable().await?;
            let result = sock.try_io(Interest::WRITABLE, || {
                nix::sys::sendfile::sendfile(sock, &std_file, Some(&mut offset), SENDFILE_CHUNK)
                    .map_err(|errno| io::Error::from_raw_os_error(errno as i32))
            });
            match result {
                Ok(0) => return Ok(Outcome::Done(total)),
                Ok(sent) => {
                    total += sent as u64;
                    counter.fetch_add(sent as u64, Ordering::Relaxed);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => continue,
                Err(_) if total == 0 => return Ok(Outcome::FallBack),
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn outbound_inserts_cr_before_bare_lf() {
        let mut wrapper = AsciiToCrlf::default();
        assert_eq!(wrapper.translate(b"a\nb\n"), b"a\r\nb\r\n");
    }

    #[test]
    fn outbound_leaves_existing_crlf_alone() {
        let mut wrapper = AsciiToCrlf::default();
        assert_eq!(wrapper.translate(b"a\r\nb"), b"a\r\nb");
    }

    #[test]
    fn outbound_crlf_split_across_chunks() {
        let mut wrapper = AsciiToCrlf::default();
        let mut out = wrapper.translate(b"a\r");
        out.extend(wrapper.translate(b"\nb\n"));
        assert_eq!(out, b"a\r\nb\r\n");
    }

    #[test]
    fn inbound_strips_cr_of_crlf() {
        let mut wrapper = CrlfToAscii::default();
        assert_eq!(wrapper.translate(b"a\r\nb\r\n"), b"a\nb\n");
        assert_eq!(wrapper.finish(), b"");
    }

    #[test]
    fn inbound_crlf_split_across_chunks() {
        let mut wrapper = CrlfToAscii::default();
        let mut out = wrapper.translate(b"a\r");
        assert_eq!(out, b"a");
        out.extend(wrapper.translate(b"\nb"));
        assert_eq!(out, b"a\nb");
        assert_eq!(wrapper.finish(), b"");
    }

    #[test]
    fn inbound_lone_cr_is_preserved() {
        let mut wrapper = CrlfToAscii::default();
        let mut out = wrapper.translate(b"a\rb");
        assert_eq!(out, b"a\rb");
        out.extend(wrapper.translate(b"c\r"));
        out.extend(wrapper.finish());
        assert_eq!(out, b"a\rbc\r");
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_sleeps_once_limit_reached() {
        let mut limiter = SpeedLimiter::new(1024);
        let before = Instant::now();
        limiter.throttle(512).await;
        assert_eq!(Instant::now(), before, "below the limit there is no sleep");
        limiter.throttle(512).await;
        assert!(Instant::now() > before, "reaching the limit must suspend");
    }

    #[tokio::test]
    async fn throttle_disabled_when_zero() {
        let mut limiter = SpeedLimiter::new(0);
        assert!(limiter.is_off());
        limiter.throttle(usize::MAX / 2).await;
    }
}
