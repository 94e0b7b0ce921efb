//! The `Diffable` capability: an explicit, per-type description of how a
//! value is laid out for comparison.
//!
//! Types describe themselves through [`Shape`]: absent, a leaf carrying a
//! [`Value`], a sequence, a record with a fixed field list, or an open map.
//! Records are usually registered with [`diffable_record!`](crate::diffable_record).

use super::value::Value;
use indexmap::IndexMap;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// FieldAccessError reports that a field exists but could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldAccessError {
    pub message: String,
}

impl FieldAccessError {
    pub fn new(message: impl Into<String>) -> Self {
        FieldAccessError {
            message: message.into(),
        }
    }
}

/// FieldEntry is one named field of a record or map.
pub struct FieldEntry<'a> {
    pub name: Cow<'a, str>,
    pub value: Result<&'a dyn Diffable, FieldAccessError>,
}

impl<'a> FieldEntry<'a> {
    /// Creates a readable field.
    pub fn new(name: impl Into<Cow<'a, str>>, value: &'a dyn Diffable) -> Self {
        FieldEntry {
            name: name.into(),
            value: Ok(value),
        }
    }

    /// Creates a field whose read failed.
    pub fn failed(name: impl Into<Cow<'a, str>>, error: FieldAccessError) -> Self {
        FieldEntry {
            name: name.into(),
            value: Err(error),
        }
    }
}

/// Shape is the structural view of a value.
pub enum Shape<'a> {
    /// Null or missing.
    Absent,
    /// Compared by value equality.
    Leaf(Value),
    /// Compared element by element.
    Sequence(Vec<&'a dyn Diffable>),
    /// Fixed field list; both sides must expose the same fields.
    Record(Vec<FieldEntry<'a>>),
    /// Open key set; a key on only one side compares against absent.
    Map(Vec<FieldEntry<'a>>),
}

impl Shape<'_> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Shape::Absent)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Absent => "absent",
            Shape::Leaf(v) => v.kind_name(),
            Shape::Sequence(_) => "sequence",
            Shape::Record(_) => "record",
            Shape::Map(_) => "map",
        }
    }
}

/// Diffable is implemented by every type the comparison engine can walk.
pub trait Diffable {
    /// Describes this value for one level of traversal.
    fn shape(&self) -> Shape<'_>;

    /// Reference identity of shared values, used to cut cycles.
    fn identity(&self) -> Option<usize> {
        None
    }
}

/// Implements [`Diffable`] for a struct as a record.
///
/// ```
/// use sparse_diff::diffable_record;
///
/// struct Person {
///     name: String,
///     role: String,
/// }
///
/// diffable_record!(Person { "Name" => name, "Role" => role });
/// ```
///
/// The bare form `diffable_record!(Person { name, role })` uses the Rust
/// field names.
#[macro_export]
macro_rules! diffable_record {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        $crate::diffable_record!($ty { $(stringify!($field) => $field),* });
    };
    ($ty:ty { $($name:expr => $field:ident),* $(,)? }) => {
        impl $crate::value::Diffable for $ty {
            fn shape(&self) -> $crate::value::Shape<'_> {
                $crate::value::Shape::Record(vec![
                    $($crate::value::FieldEntry::new($name, &self.$field)),*
                ])
            }
        }
    };
}

macro_rules! small_int_leaf {
    ($($t:ty),*) => {
        $(
            impl Diffable for $t {
                fn shape(&self) -> Shape<'_> {
                    Shape::Leaf(Value::Int(*self as i64))
                }
            }
        )*
    };
}

macro_rules! wide_int_leaf {
    ($($t:ty),*) => {
        $(
            impl Diffable for $t {
                fn shape(&self) -> Shape<'_> {
                    match i64::try_from(*self) {
                        Ok(i) => Shape::Leaf(Value::Int(i)),
                        Err(_) => Shape::Leaf(Value::Float(*self as f64)),
                    }
                }
            }
        )*
    };
}

small_int_leaf!(i8, i16, i32, i64, isize, u8, u16, u32);
wide_int_leaf!(u64, usize, i128, u128);

impl Diffable for bool {
    fn shape(&self) -> Shape<'_> {
        Shape::Leaf(Value::Bool(*self))
    }
}

impl Diffable for f32 {
    fn shape(&self) -> Shape<'_> {
        Shape::Leaf(Value::Float(*self as f64))
    }
}

impl Diffable for f64 {
    fn shape(&self) -> Shape<'_> {
        Shape::Leaf(Value::Float(*self))
    }
}

impl Diffable for char {
    fn shape(&self) -> Shape<'_> {
        Shape::Leaf(Value::String(self.to_string()))
    }
}

impl Diffable for str {
    fn shape(&self) -> Shape<'_> {
        Shape::Leaf(Value::String(self.to_string()))
    }
}

impl Diffable for String {
    fn shape(&self) -> Shape<'_> {
        Shape::Leaf(Value::String(self.clone()))
    }
}

impl Diffable for Value {
    fn shape(&self) -> Shape<'_> {
        match self {
            Value::Null => Shape::Absent,
            Value::List(items) => Shape::Sequence(items.iter().map(|v| v as &dyn Diffable).collect()),
            Value::Map(map) => Shape::Map(
                map.iter()
                    .map(|(k, v)| FieldEntry::new(k.as_str(), v))
                    .collect(),
            ),
            leaf => Shape::Leaf(leaf.clone()),
        }
    }
}

impl<T: Diffable> Diffable for Option<T> {
    fn shape(&self) -> Shape<'_> {
        match self {
            Some(v) => v.shape(),
            None => Shape::Absent,
        }
    }

    fn identity(&self) -> Option<usize> {
        self.as_ref().and_then(Diffable::identity)
    }
}

impl<T: Diffable> Diffable for [T] {
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(self.iter().map(|v| v as &dyn Diffable).collect())
    }
}

impl<T: Diffable> Diffable for Vec<T> {
    fn shape(&self) -> Shape<'_> {
        self.as_slice().shape()
    }
}

impl<T: Diffable> Diffable for VecDeque<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(self.iter().map(|v| v as &dyn Diffable).collect())
    }
}

impl<T: Diffable + ?Sized> Diffable for &T {
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }

    fn identity(&self) -> Option<usize> {
        (**self).identity()
    }
}

impl<T: Diffable + ?Sized> Diffable for Box<T> {
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }

    fn identity(&self) -> Option<usize> {
        (**self).identity()
    }
}

impl<T: Diffable + ?Sized> Diffable for Rc<T> {
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(self) as *const () as usize)
    }
}

impl<T: Diffable + ?Sized> Diffable for Arc<T> {
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }

    fn identity(&self) -> Option<usize> {
        Some(Arc::as_ptr(self) as *const () as usize)
    }
}

impl<T: Diffable> Diffable for once_cell::unsync::OnceCell<T> {
    fn shape(&self) -> Shape<'_> {
        match self.get() {
            Some(v) => v.shape(),
            None => Shape::Absent,
        }
    }

    fn identity(&self) -> Option<usize> {
        self.get().and_then(Diffable::identity)
    }
}

impl<T: Diffable> Diffable for BTreeMap<String, T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Map(
            self.iter()
                .map(|(k, v)| FieldEntry::new(k.as_str(), v))
                .collect(),
        )
    }
}

impl<T: Diffable, S> Diffable for HashMap<String, T, S> {
    fn shape(&self) -> Shape<'_> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Shape::Map(
            entries
                .into_iter()
                .map(|(k, v)| FieldEntry::new(k.as_str(), v))
                .collect(),
        )
    }
}

impl<T: Diffable, S> Diffable for IndexMap<String, T, S> {
    fn shape(&self) -> Shape<'_> {
        Shape::Map(
            self.iter()
                .map(|(k, v)| FieldEntry::new(k.as_str(), v))
                .collect(),
        )
    }
}
