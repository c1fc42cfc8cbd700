//! Backing type synthesis.
//!
//! The backing type is the generated host class: it extends the requested
//! base type, implements the requested interfaces and carries one forwarding
//! method per bound override. It is described with a small builder API and
//! only turned into a live [`TypeEntry`] when its load unit is created.

use std::fmt;

use hostbridge_core::{
    ConstructorHook, FieldEntry, ForwardingBody, MethodBody, MethodEntry, MethodSignature,
    Modifiers, NativeType, TypeEntry, TypeRef,
};

use crate::resolver::Resolution;

/// Name of the single field every backing type carries.
pub const WRAPPER_FIELD: &str = "wrapper";

/// Suffix appended to the backing type's name to name its wrapper.
pub const WRAPPER_SUFFIX: &str = "$Wrapper";

/// A field of a generated class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: NativeType,
    pub modifiers: Modifiers,
}

/// A method of a generated class.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub signature: MethodSignature,
    pub modifiers: Modifiers,
    pub body: ForwardingBody,
    /// Qualified name of the type declaring the overridden method.
    pub overrides: String,
}

/// A generated class, ready to be loaded.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub name: String,
    pub modifiers: Modifiers,
    pub superclass: TypeRef,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifiers::ABSTRACT)
    }

    /// The method overriding `signature`, if any.
    pub fn method(&self, signature: &MethodSignature) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.signature.matches_exactly(signature))
    }

    /// Build the live type entry. `constructor` becomes its instantiation
    /// hook.
    pub fn into_type_entry(self, constructor: ConstructorHook) -> TypeEntry {
        let mut entry = TypeEntry::class(self.name)
            .with_modifiers(self.modifiers)
            .with_superclass(self.superclass)
            .with_constructor(constructor);
        for interface in self.interfaces {
            entry = entry.with_interface(interface);
        }
        for field in self.fields {
            entry = entry.with_field(FieldEntry::new(field.name, field.field_type, field.modifiers));
        }
        for method in self.methods {
            entry = entry.with_method(MethodEntry::new(
                method.signature,
                method.modifiers,
                MethodBody::Forward(method.body),
            ));
        }
        entry
    }
}

/// Human-readable listing, written to the diagnostics directory.
impl fmt::Display for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} class {} extends {}",
            self.modifiers,
            self.name,
            self.superclass.qualified_name()
        )?;
        if !self.interfaces.is_empty() {
            let names: Vec<_> = self.interfaces.iter().map(|i| i.qualified_name()).collect();
            write!(f, " implements {}", names.join(", "))?;
        }
        writeln!(f, " {{")?;
        for field in &self.fields {
            writeln!(
                f,
                "    {} {} {};",
                field.modifiers,
                field.field_type.descriptor(),
                field.name
            )?;
        }
        if !self.fields.is_empty() && !self.methods.is_empty() {
            writeln!(f)?;
        }
        for method in &self.methods {
            writeln!(
                f,
                "    {} {} -> {:?}    // overrides {}",
                method.modifiers, method.signature, method.body, method.overrides
            )?;
        }
        writeln!(f, "}}")
    }
}

/// Fluent builder for [`ClassDescriptor`].
pub struct ClassBuilder {
    descriptor: ClassDescriptor,
}

impl ClassBuilder {
    /// A public synthetic class extending `superclass`.
    pub fn new(name: impl Into<String>, superclass: TypeRef) -> Self {
        Self {
            descriptor: ClassDescriptor {
                name: name.into(),
                modifiers: Modifiers::PUBLIC | Modifiers::SYNTHETIC,
                superclass,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn interface(mut self, interface: TypeRef) -> Self {
        self.descriptor.interfaces.push(interface);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.descriptor.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.descriptor.methods.push(method);
        self
    }

    pub fn abstract_class(mut self, is_abstract: bool) -> Self {
        self.descriptor.modifiers.set(Modifiers::ABSTRACT, is_abstract);
        self
    }

    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

/// Describe the backing type for a resolved request.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn synthesize_backing(
    name: &str,
    base: &TypeRef,
    interfaces: &[TypeRef],
    resolution: &Resolution,
) -> ClassDescriptor {
    let mut builder = ClassBuilder::new(name, base.clone())
        .abstract_class(resolution.is_abstract())
        .field(FieldDescriptor {
            name: WRAPPER_FIELD.to_string(),
            field_type: NativeType::reference(format!("{name}{WRAPPER_SUFFIX}")),
            modifiers: Modifiers::PRIVATE | Modifiers::FINAL,
        });
    for interface in interfaces {
        builder = builder.interface(interface.clone());
    }

    for bound in &resolution.bound {
        let visibility = if bound.member.modifiers.contains(Modifiers::PROTECTED) {
            Modifiers::PROTECTED
        } else {
            Modifiers::PUBLIC
        };
        builder = builder.method(MethodDescriptor {
            signature: bound.member.signature.clone(),
            modifiers: visibility,
            body: ForwardingBody::new(bound.member_id, bound.key.as_str()),
            overrides: bound.member.declaring_type.qualified_name().to_string(),
        });
    }

    builder.build()
}
