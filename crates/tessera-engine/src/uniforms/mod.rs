//! Material uniform values, their buffer layout and shader-side discovery.

pub mod introspect;
pub mod packer;
mod value;

pub use introspect::{TextualReflection, UniformReflection};
pub use packer::{pack, pack_into, packed_len};
pub use value::{UniformData, UniformValue, Uniforms};
