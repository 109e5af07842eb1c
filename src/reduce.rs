//! Element-wise reduction primitives used by `reduce` and `all_reduce`.

use crate::element::Element;
use crate::error::{MeshError, Result};
use crate::types::ReduceOp;

/// Element types that support the four reduction operators.
pub trait Reducible: Element {
    fn reduce(a: Self, b: Self, op: ReduceOp) -> Self;
}

macro_rules! impl_reducible {
    (int: $($ty:ty),*) => {
        $(
            impl Reducible for $ty {
                #[inline]
                fn reduce(a: Self, b: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Sum => a.wrapping_add(b),
                        ReduceOp::Prod => a.wrapping_mul(b),
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    }
                }
            }
        )*
    };
    (float: $($ty:ty),*) => {
        $(
            impl Reducible for $ty {
                #[inline]
                fn reduce(a: Self, b: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Sum => a + b,
                        ReduceOp::Prod => a * b,
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    }
                }
            }
        )*
    };
}

impl_reducible!(int: i8, i32, i64, u8, u32, u64);
impl_reducible!(float: f32, f64);

/// `dst[i] = dst[i] op src[i]` for every index.
pub(crate) fn reduce_slice<T: Reducible>(dst: &mut [T], src: &[T], op: ReduceOp) -> Result<()> {
    if dst.len() != src.len() {
        return Err(MeshError::BufferSizeMismatch {
            expected: dst.len() * T::SIZE,
            actual: src.len() * T::SIZE,
        });
    }
    for (d, s) in dst.iter_mut().zip(src) {
        *d = T::reduce(*d, *s, op);
    }
    Ok(())
}
