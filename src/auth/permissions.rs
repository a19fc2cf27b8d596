use bitflags::bitflags;
use std::fmt::{self, Display, Formatter, Write};

bitflags! {
    /// The set of filesystem operations a user is allowed to perform,
    /// drawn from the classic letter alphabet `elradfmwMT`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Perm: u16 {
        /// `e` - change directory (CWD, CDUP)
        const CHANGE_DIR = 0b0000000001;
        /// `l` - list files (LIST, NLST, STAT, MLSD, MLST, SIZE, MDTM)
        const LIST       = 0b0000000010;
        /// `r` - retrieve files (RETR)
        const RETRIEVE   = 0b0000000100;
        /// `a` - append data to an existing file (APPE)
        const APPEND     = 0b0000001000;
        /// `d` - delete a file or directory (DELE, RMD)
        const DELETE     = 0b0000010000;
        /// `f` - rename a file or directory (RNFR, RNTO)
        const RENAME     = 0b0000100000;
        /// `m` - create a directory (MKD)
        const MKDIR      = 0b0001000000;
        /// `w` - store a file (STOR, STOU)
        const STORE      = 0b0010000000;
        /// `M` - change file mode (SITE CHMOD)
        const CHMOD      = 0b0100000000;
        /// `T` - change file modification time (MFMT)
        const MFMT       = 0b1000000000;

        /// All read-only letters (`elr`), the default for anonymous users.
        const READ_ANY  = Self::CHANGE_DIR.bits() | Self::LIST.bits() | Self::RETRIEVE.bits();
        /// All letters granting some form of write access (`adfmwMT`).
        const WRITE_ANY = Self::APPEND.bits() | Self::DELETE.bits() | Self::RENAME.bits()
            | Self::MKDIR.bits() | Self::STORE.bits() | Self::CHMOD.bits() | Self::MFMT.bits();
    }
}

const LETTERS: [(char, Perm); 10] = [
    ('e', Perm::CHANGE_DIR),
    ('l', Perm::LIST),
    ('r', Perm::RETRIEVE),
    ('a', Perm::APPEND),
    ('d', Perm::DELETE),
    ('f', Perm::RENAME),
    ('m', Perm::MKDIR),
    ('w', Perm::STORE),
    ('M', Perm::CHMOD),
    ('T', Perm::MFMT),
];

impl Perm {
    /// Parses a permission string like `"elradfmwMT"`. Returns the offending
    /// character if it is not part of the alphabet.
    pub fn from_letters(letters: &str) -> Result<Perm, char> {
        let mut perm = Perm::empty();
        for c in letters.chars() {
            match LETTERS.iter().find(|(l, _)| *l == c) {
                Some((_, p)) => perm |= *p,
                None => return Err(c),
            }
        }
        Ok(perm)
    }

    /// Renders the set back into its letter form, in canonical order.
    pub fn letters(&self) -> String {
        LETTERS.iter().filter(|(_, p)| self.contains(*p)).map(|(l, _)| *l).collect()
    }
}

impl Display for Perm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (l, p) in LETTERS {
            if self.contains(p) {
                f.write_char(l)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_full_alphabet() {
        let perm = Perm::from_letters("elradfmwMT").unwrap();
        assert_eq!(perm, Perm::all());
        assert_eq!(perm.letters(), "elradfmwMT");
    }

    #[test]
    fn parse_read_only() {
        let perm = Perm::from_letters("elr").unwrap();
        assert_eq!(perm, Perm::READ_ANY);
        assert!(!perm.intersects(Perm::WRITE_ANY));
    }

    #[test]
    fn case_matters() {
        // 't' is not a valid letter, 'T' is.
        assert_eq!(Perm::from_letters("t"), Err('t'));
        assert_eq!(Perm::from_letters("T"), Ok(Perm::MFMT));
        assert_eq!(Perm::from_letters("x"), Err('x'));
    }

    #[test]
    fn duplicates_are_harmless() {
        assert_eq!(Perm::from_letters("eee").unwrap(), Perm::CHANGE_DIR);
    }
}
