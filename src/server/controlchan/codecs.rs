use super::{Reply, command::Command, error::ControlChanError, error::ControlChanErrorKind, line_parser};
use crate::options::Encoding;

use bytes::BytesMut;
use std::io::Write;
use tokio_util::codec::{Decoder, Encoder};

// The maximum length of a command line, terminator included. Longer lines are
// discarded up to the next newline and answered with a 500.
const MAX_LINE_LEN: usize = 8 * 1024;

// FtpCodec implements tokio's `Decoder` and `Encoder` traits for the control
// channel, decoding FTP commands and encoding replies.
pub struct FtpCodec {
    // Stored index of the next index to examine for a '\n' character. This is
    // used to optimize searching. For example, if `decode` was called with
    // `abc`, it would hold `3`, because that is the next index to examine.
    next_index: usize,
    // When a line overflowed MAX_LINE_LEN everything up to the next newline
    // is thrown away before parsing resumes.
    discarding: bool,
    encoding: Encoding,
}

impl FtpCodec {
    pub fn new(encoding: Encoding) -> Self {
        FtpCodec {
            next_index: 0,
            discarding: false,
            encoding,
        }
    }
}

impl Decoder for FtpCodec {
    // Unknown verbs, bad arguments and overlong lines must not kill the
    // session, and the framed stream terminates after a decoder `Error`; so
    // those recoverable failures travel inside the item. `Error` is reserved
    // for real IO trouble.
    type Item = Result<Command, ControlChanError>;
    type Error = ControlChanError;

    // Decode the incoming bytes into a meaningful command: split on newlines
    // and parse the resulting line with `line_parser::parse`.
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline_offset = buf[self.next_index..].iter().position(|b| *b == b'\n');
        if self.discarding {
            match newline_offset {
                Some(offset) => {
                    let _ = buf.split_to(self.next_index + offset + 1);
                    self.next_index = 0;
                    self.discarding = false;
                    return Ok(Some(Err(ControlChanErrorKind::CommandTooLong.into())));
                }
                None => {
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
            }
        }
        match newline_offset {
            Some(offset) => {
                let newline_index = offset + self.next_index;
                if newline_index + 1 > MAX_LINE_LEN {
                    let _ = buf.split_to(newline_index + 1);
                    self.next_index = 0;
                    return Ok(Some(Err(ControlChanErrorKind::CommandTooLong.into())));
                }
                let line = buf.split_to(newline_index + 1);
                self.next_index = 0;
                Ok(Some(line_parser::parse(line, self.encoding).map_err(ControlChanError::from)))
            }
            None if buf.len() > MAX_LINE_LEN => {
                buf.clear();
                self.next_index = 0;
                self.discarding = true;
                Ok(None)
            }
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }
}

impl Encoder<Reply> for FtpCodec {
    type Error = ControlChanError;

    // Encode the outgoing reply, taking care of the RFC 959 multi-line form.
    fn encode(&mut self, reply: Reply, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let mut buffer = vec![];
        encode_reply(&mut buffer, reply)?;
        buf.extend(&buffer);
        Ok(())
    }
}

fn encode_reply(buffer: &mut Vec<u8>, reply: Reply) -> Result<(), ControlChanError> {
    match reply {
        Reply::None => {}
        Reply::CodeAndMsg { code, msg } => {
            if msg.is_empty() {
                write!(buffer, "{}\r\n", code as u32)?;
            } else {
                write!(buffer, "{} {}\r\n", code as u32, msg)?;
            }
        }
        Reply::MultiLine { code, mut lines } => {
            let last_line = lines.pop().unwrap_or_default();
            // Lines starting with a digit could be mistaken for a reply code
            // and should be indented.
            for line in lines.iter_mut() {
                if line.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    line.insert(0, ' ');
                }
            }
            if lines.is_empty() {
                write!(buffer, "{} {}\r\n", code as u32, last_line)?;
            } else {
                write!(buffer, "{}-{}\r\n{} {}\r\n", code as u32, lines.join("\r\n"), code as u32, last_line)?;
            }
        }
        Reply::Sequence(replies) => {
            for reply in replies {
                encode_reply(buffer, reply)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ReplyCode;
    use pretty_assertions::assert_eq;

    fn encoded(reply: Reply) -> String {
        let mut codec = FtpCodec::new(Encoding::Utf8);
        let mut buf = BytesMut::new();
        codec.encode(reply, &mut buf).unwrap();
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn single_line_reply() {
        assert_eq!(encoded(Reply::new(ReplyCode::CommandOkay, "Okidoki")), "200 Okidoki\r\n");
    }

    #[test]
    fn multi_line_reply() {
        let reply = Reply::new_multiline(ReplyCode::SystemStatus, vec!["Features supported:", " SIZE", "End FEAT."]);
        assert_eq!(encoded(reply), "211-Features supported:\r\n SIZE\r\n211 End FEAT.\r\n");
    }

    #[test]
    fn sequence_reply() {
        let reply = Reply::Sequence(vec![
            Reply::new(ReplyCode::ConnectionClosed, "Connection closed; transfer aborted."),
            Reply::new(ReplyCode::ClosingDataConnection, "ABOR command successful."),
        ]);
        assert_eq!(
            encoded(reply),
            "426 Connection closed; transfer aborted.\r\n226 ABOR command successful.\r\n"
        );
    }

    #[test]
    fn decode_command_line() {
        let mut codec = FtpCodec::new(Encoding::Utf8);
        let mut buf = BytesMut::from(&b"NOOP\r\n"[..]);
        let cmd = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(cmd, Command::Noop);
    }

    #[test]
    fn decode_waits_for_newline() {
        let mut codec = FtpCodec::new(Encoding::Utf8);
        let mut buf = BytesMut::from(&b"NO"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"OP\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), Command::Noop);
    }

    #[test]
    fn overlong_line_is_discarded() {
        let mut codec = FtpCodec::new(Encoding::Utf8);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'A'; MAX_LINE_LEN + 10]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"tail\r\nNOOP\r\n");
        let err = codec.decode(&mut buf).unwrap().unwrap().unwrap_err();
        assert_eq!(err.kind(), &ControlChanErrorKind::CommandTooLong);
        // The next command parses normally again.
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), Command::Noop);
    }
}
