//! CLR binding registry for the Tsonic compiler.
//!
//! This crate provides:
//! - `BindingsFile` and friends - validated binding manifest records
//! - `BindingRegistry` - hierarchical `namespace.type.member` lookup with
//!   overload lists preserved in declaration order
//! - The member-access resolution protocol used during lowering
//! - Extension-method buckets and the by-receiver extension index

pub mod manifest;
pub use manifest::{
    BindingTarget, BindingsFile, MemberKind, MemberManifest, NamespaceManifest, ParameterModifier,
    TypeKind, TypeManifest,
};

pub mod registry;
pub use registry::{
    is_extension_bucket_name, BindingRegistry, MemberBinding, NamespaceBinding, TypeBinding,
    EXTENSION_BUCKET_PREFIXES,
};

pub mod member_access;
pub use member_access::{
    extract_instance_type_name, resolve_member_access, MemberResolution, ReceiverShape,
    ResolvedMember,
};
