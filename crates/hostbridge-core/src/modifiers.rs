//! Access and inheritance modifiers for host types and members.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Modifiers carried by host types and their methods.
    ///
    /// # Common Combinations
    ///
    /// ```
    /// use hostbridge_core::Modifiers;
    ///
    /// let open_class = Modifiers::PUBLIC;
    /// let interface = Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT;
    /// assert!(open_class.can_inherit());
    /// assert!(interface.is_interface());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        /// Visible everywhere.
        const PUBLIC = 0x0001;
        /// Visible to subtypes.
        const PROTECTED = 0x0002;
        /// Visible only to the declaring type.
        const PRIVATE = 0x0004;
        /// Belongs to the type rather than its instances.
        const STATIC = 0x0008;
        /// Cannot be overridden (methods) or extended (types).
        const FINAL = 0x0010;
        /// Has no implementation (methods) or cannot be instantiated (types).
        const ABSTRACT = 0x0020;
        /// The type is an interface.
        const INTERFACE = 0x0040;
        /// The type was produced at runtime by the class bridge.
        const SYNTHETIC = 0x0080;
    }
}

impl Modifiers {
    pub fn is_public(self) -> bool {
        self.contains(Modifiers::PUBLIC)
    }

    pub fn is_protected(self) -> bool {
        self.contains(Modifiers::PROTECTED)
    }

    pub fn is_private(self) -> bool {
        self.contains(Modifiers::PRIVATE)
    }

    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    pub fn is_final(self) -> bool {
        self.contains(Modifiers::FINAL)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }

    pub fn is_interface(self) -> bool {
        self.contains(Modifiers::INTERFACE)
    }

    pub fn is_synthetic(self) -> bool {
        self.contains(Modifiers::SYNTHETIC)
    }

    /// A type can be extended or implemented when it is public and not final.
    pub fn can_inherit(self) -> bool {
        self.is_public() && !self.is_final()
    }

    /// A method can be overridden when it is neither final, private nor static.
    pub fn is_overridable(self) -> bool {
        !self.intersects(Modifiers::FINAL | Modifiers::PRIVATE | Modifiers::STATIC)
    }

    /// Visibility bits only.
    pub fn visibility(self) -> Modifiers {
        self & (Modifiers::PUBLIC | Modifiers::PROTECTED | Modifiers::PRIVATE)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = [
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::ABSTRACT, "abstract"),
            (Modifiers::SYNTHETIC, "synthetic"),
            (Modifiers::INTERFACE, "interface"),
        ];
        let mut first = true;
        for (flag, word) in words {
            if self.contains(flag) {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{word}")?;
                first = false;
            }
        }
        Ok(())
    }
}
