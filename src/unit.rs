//! Load units.
//!
//! A [`LoadUnit`] describes exactly one generated backing/wrapper pair.
//! Loading turns the two descriptors into a live [`TypeEntry`](hostbridge_core::TypeEntry)
//! and [`WrapperClass`], and registers the backing name in the
//! [`HostRegistry`] without pinning it.
//!
//! The backing type is the only owner of a unit:
//!
//! ```text
//! backing TypeRef -> constructor hook -> WrapperClass -> LoadUnit
//!        ^                                   |
//!        +------------- weak ----------------+
//! ```
//!
//! Facets, instances and subtypes all hold the backing type, so the unit
//! stays loaded while any of them is referenced. Once none is, the registry
//! entry dies with it and the name can be generated again.
//!
//! In development mode a listing of both generated types is written to the
//! diagnostics directory. The listing is a side channel only; failing to
//! write it is logged and ignored.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use xxhash_rust::xxh64::xxh64;

use hostbridge_core::{ConstructorHook, GenerationError, RegistrationError, TypeRef};
use hostbridge_registry::HostRegistry;

use crate::config::BridgeConfig;
use crate::synth::{ClassDescriptor, WrapperDescriptor};
use crate::wrapper::WrapperClass;

/// Bookkeeping for one loaded backing/wrapper pair.
pub struct LoadUnit {
    id: u64,
    name: String,
    /// Hash of the diagnostics listing, for telling regenerated types apart.
    listing_hash: Option<u64>,
    diagnostics_path: Option<PathBuf>,
}

/// The live halves of a freshly loaded unit.
///
/// Holding `backing` keeps the unit loaded.
#[derive(Debug, Clone)]
pub struct LoadedPair {
    pub backing: TypeRef,
    pub wrapper: Arc<WrapperClass>,
}

impl LoadUnit {
    /// Load a synthesized pair.
    ///
    /// Fails with [`GenerationError::NameCollision`] if a live type with the
    /// backing name is already registered. Nothing stays loaded on failure.
    /// The unit itself is reachable through [`WrapperClass::load_unit`].
    pub fn load(
        registry: &HostRegistry,
        config: &BridgeConfig,
        id: u64,
        backing: ClassDescriptor,
        wrapper: WrapperDescriptor,
    ) -> Result<LoadedPair, GenerationError> {
        let base_name = backing.superclass.name().to_string();
        let listing = config
            .development
            .then(|| render_listing(id, &backing, &wrapper));

        let backing_name = backing.name.clone();
        let wrapper = Arc::new(WrapperClass::new(
            wrapper,
            backing_name.clone(),
            backing.is_abstract(),
        ));
        let hook = {
            let wrapper = Arc::clone(&wrapper);
            ConstructorHook::new(move |_ty, args| wrapper.construct_native(args))
        };
        let backing = backing.into_type_entry(hook).into_ref();

        registry
            .register_generated(&backing)
            .map_err(|err| match err {
                RegistrationError::DuplicateType(name) => GenerationError::NameCollision { name },
                other => GenerationError::Registration(other),
            })?;
        wrapper.bind_backing(&backing).map_err(|err| {
            GenerationError::Registration(RegistrationError::InvalidType {
                name: backing_name.clone(),
                reason: err.to_string(),
            })
        })?;

        let listing_hash = listing.as_deref().map(|text| xxh64(text.as_bytes(), 0));
        let diagnostics_path = listing.and_then(|text| {
            write_listing(&config.diagnostics_dir, &base_name, id, &text)
        });

        tracing::debug!(unit = id, name = %backing_name, "loaded generated pair");
        wrapper.attach_unit(LoadUnit {
            id,
            name: backing_name,
            listing_hash,
            diagnostics_path,
        });
        Ok(LoadedPair { backing, wrapper })
    }

    /// Counter value this unit was generated with.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Qualified name of the backing type.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listing_hash(&self) -> Option<u64> {
        self.listing_hash
    }

    /// Where the diagnostics listing was written, if it was.
    pub fn diagnostics_path(&self) -> Option<&Path> {
        self.diagnostics_path.as_deref()
    }
}

impl Drop for LoadUnit {
    fn drop(&mut self) {
        tracing::debug!(unit = self.id, name = %self.name, "unit released");
    }
}

impl std::fmt::Debug for LoadUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("diagnostics_path", &self.diagnostics_path)
            .finish()
    }
}

fn render_listing(id: u64, backing: &ClassDescriptor, wrapper: &WrapperDescriptor) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "// load unit {id}");
    let _ = writeln!(out, "{backing}");
    let _ = write!(out, "{wrapper}");
    out
}

fn write_listing(dir: &Path, base_name: &str, id: u64, listing: &str) -> Option<PathBuf> {
    let path = dir.join(format!("{base_name}_{id}.txt"));
    let result = fs::create_dir_all(dir).and_then(|()| fs::write(&path, listing));
    match result {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "wrote generated type listing");
            Some(path)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not write generated type listing");
            None
        }
    }
}
