use std::fmt;
use std::str::FromStr;

const SCHEME: &str = "attachment://";

/// A reference from a leaf to its payload in the attachment list,
/// written as `attachment://<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentRef(usize);

impl AttachmentRef {
    pub fn new(index: usize) -> Self {
        AttachmentRef(index)
    }

    /// Rank of the payload in the attachment list.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SCHEME, self.0)
    }
}

impl FromStr for AttachmentRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let index = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| format!("not an attachment reference: {}", s))?;
        index
            .parse()
            .map(AttachmentRef)
            .map_err(|_| format!("invalid attachment index in {}", s))
    }
}
