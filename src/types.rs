/// Rank of a participant in a communicator (0-indexed).
pub type Rank = u32;

/// Application-chosen message label.
pub type Tag = u32;

/// Identifier separating one communicator's message namespace from another's.
pub type ContextId = u32;

/// Current wire protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Contexts with this bit set carry collective traffic and are never handed
/// out to applications.
pub(crate) const COLLECTIVE_CONTEXT_BIT: ContextId = 1 << 31;

/// Which sender a receive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Only messages from this rank.
    Rank(Rank),
    /// Messages from any rank.
    Any,
}

impl Source {
    pub fn matches(self, src: Rank) -> bool {
        match self {
            Source::Rank(r) => r == src,
            Source::Any => true,
        }
    }
}

impl From<Rank> for Source {
    fn from(rank: Rank) -> Self {
        Source::Rank(rank)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Rank(r) => write!(f, "{r}"),
            Source::Any => f.write_str("any"),
        }
    }
}

/// Which tags a receive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagSelector {
    Tag(Tag),
    Any,
}

impl TagSelector {
    pub fn matches(self, tag: Tag) -> bool {
        match self {
            TagSelector::Tag(t) => t == tag,
            TagSelector::Any => true,
        }
    }
}

impl From<Tag> for TagSelector {
    fn from(tag: Tag) -> Self {
        TagSelector::Tag(tag)
    }
}

impl std::fmt::Display for TagSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagSelector::Tag(t) => write!(f, "{t}"),
            TagSelector::Any => f.write_str("any"),
        }
    }
}

/// Addressing of a single message.
///
/// Matching identity is `(source, tag, context)`; `dest` is implied by the
/// rank that receives the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Envelope {
    pub source: Rank,
    pub dest: Rank,
    pub tag: Tag,
    pub context: ContextId,
}

/// Outcome of a completed send or receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Sender of the message. For completed sends this is the local rank.
    pub source: Rank,
    /// Tag the message was sent with.
    pub tag: Tag,
    /// Number of elements transferred.
    pub count: usize,
}

/// Send strategy, chosen per message from its byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Copy into the transport and return without waiting for the receiver.
    Eager,
    /// Announce, wait for the matching receive to clear the transfer, then send.
    Rendezvous,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Eager => f.write_str("eager"),
            Protocol::Rendezvous => f.write_str("rendezvous"),
        }
    }
}

/// Element types that can travel in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    F32 = 0,
    F64 = 1,
    I8 = 4,
    I32 = 5,
    I64 = 6,
    U8 = 7,
    U32 = 8,
    U64 = 9,
}

impl DataType {
    /// Size of one element in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
            DataType::I8 | DataType::U8 => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::I8 => "i8",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reduction operators for `reduce` and `all_reduce`.
///
/// All four are associative and commutative on integers. Integer `Sum` and
/// `Prod` wrap on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Prod,
    Min,
    Max,
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => f.write_str("sum"),
            ReduceOp::Prod => f.write_str("prod"),
            ReduceOp::Min => f.write_str("min"),
            ReduceOp::Max => f.write_str("max"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_matching() {
        assert!(Source::Any.matches(3));
        assert!(Source::Rank(3).matches(3));
        assert!(!Source::Rank(3).matches(2));
        assert_eq!(Source::from(7), Source::Rank(7));
    }

    #[test]
    fn test_tag_matching() {
        assert!(TagSelector::Any.matches(0));
        assert!(TagSelector::Tag(5).matches(5));
        assert!(!TagSelector::Tag(5).matches(6));
    }

    #[test]
    fn test_datatype_sizes() {
        assert_eq!(DataType::F32.size_in_bytes(), 4);
        assert_eq!(DataType::F64.size_in_bytes(), 8);
        assert_eq!(DataType::I8.size_in_bytes(), 1);
        assert_eq!(DataType::I32.size_in_bytes(), 4);
        assert_eq!(DataType::I64.size_in_bytes(), 8);
        assert_eq!(DataType::U8.size_in_bytes(), 1);
        assert_eq!(DataType::U32.size_in_bytes(), 4);
        assert_eq!(DataType::U64.size_in_bytes(), 8);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::I32.to_string(), "i32");
        assert_eq!(ReduceOp::Max.to_string(), "max");
        assert_eq!(Protocol::Rendezvous.to_string(), "rendezvous");
        assert_eq!(Source::Any.to_string(), "any");
        assert_eq!(TagSelector::Tag(9).to_string(), "9");
    }

    #[test]
    fn test_collective_bit_is_high() {
        assert_eq!(COLLECTIVE_CONTEXT_BIT, 0x8000_0000);
    }
}
