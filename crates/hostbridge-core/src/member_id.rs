//! Dense member ids used by generated dispatch tables.

use std::fmt;

/// Small signed integer naming a script member in a generated wrapper.
///
/// - `0` is the default case and never names a member.
/// - `1` is the constructor.
/// - Instance members count up from `2`.
/// - Static members count down from `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub i32);

impl MemberId {
    /// The "unknown member" sentinel.
    pub const DEFAULT: MemberId = MemberId(0);
    /// The reserved constructor id.
    pub const CONSTRUCTOR: MemberId = MemberId(1);
    /// First id handed to an instance member.
    pub const FIRST_INSTANCE: MemberId = MemberId(2);
    /// First id handed to a static member.
    pub const FIRST_STATIC: MemberId = MemberId(-1);

    pub const fn value(self) -> i32 {
        self.0
    }

    pub const fn is_default(self) -> bool {
        self.0 == 0
    }

    pub const fn is_constructor(self) -> bool {
        self.0 == 1
    }

    pub const fn is_instance(self) -> bool {
        self.0 >= 2
    }

    pub const fn is_static(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out ids for one facet in strictly monotonic order.
#[derive(Debug, Clone)]
pub struct MemberIdAllocator {
    next: i32,
    step: i32,
}

impl MemberIdAllocator {
    /// Allocator for instance ids: 2, 3, 4, ...
    pub fn instance() -> Self {
        Self {
            next: MemberId::FIRST_INSTANCE.0,
            step: 1,
        }
    }

    /// Allocator for static ids: -1, -2, -3, ...
    pub fn statics() -> Self {
        Self {
            next: MemberId::FIRST_STATIC.0,
            step: -1,
        }
    }

    /// Take the next id.
    pub fn allocate(&mut self) -> MemberId {
        let id = MemberId(self.next);
        self.next += self.step;
        id
    }

    /// The last id handed out, if any.
    pub fn last(&self) -> Option<MemberId> {
        let last = self.next - self.step;
        if last == MemberId::CONSTRUCTOR.0 || last == MemberId::DEFAULT.0 {
            None
        } else {
            Some(MemberId(last))
        }
    }
}

/// The two halves of an implementation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    /// Members of each constructed instance.
    Instance,
    /// Members of the generated type itself.
    Static,
}

impl Facet {
    /// The id allocator for this facet's id space.
    pub fn allocator(self) -> MemberIdAllocator {
        match self {
            Facet::Instance => MemberIdAllocator::instance(),
            Facet::Static => MemberIdAllocator::statics(),
        }
    }

    /// The facet an id belongs to, if any.
    pub fn of(id: MemberId) -> Option<Facet> {
        if id.is_instance() {
            Some(Facet::Instance)
        } else if id.is_static() {
            Some(Facet::Static)
        } else {
            None
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Instance => write!(f, "instance"),
            Facet::Static => write!(f, "static"),
        }
    }
}
