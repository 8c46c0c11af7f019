//! Type descriptors for Stela packages.
//!
//! The type system is a closed variant: every consumer (the serializer in
//! `stela_codegen`, the checker in `stela_front`, the human-readable printer
//! here) matches exhaustively on [`Type`], so adding a kind is a compile error
//! at every site until it is handled.
//!
//! # Kinds
//!
//! ```text
//! leaves:     Any Bool Id Int Real Str TimeDiff TimePnt
//! elemental:  List Opt Seq Set Err
//! composite:  Dict Obj Addr Func
//! transparent: Mutable (behaves as the type stored at its address)
//! ```

mod display;
mod objects;

use std::collections::BTreeMap;

pub use objects::collect_objects;

/// Match arm pattern for leaf `Type` variants (no nested types).
#[macro_export]
macro_rules! type_leaf_pattern {
    () => {
        $crate::Type::Any
            | $crate::Type::Bool
            | $crate::Type::Id
            | $crate::Type::Int
            | $crate::Type::Real
            | $crate::Type::Str
            | $crate::Type::TimeDiff
            | $crate::Type::TimePnt
    };
}

/// Sort direction of one address component.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddrDir {
    Asc,
    Desc,
}

impl AddrDir {
    /// Lowercase keyword used in source and in human-readable output.
    pub fn keyword(self) -> &'static str {
        match self {
            AddrDir::Asc => "asc",
            AddrDir::Desc => "desc",
        }
    }
}

/// A composite record type: named fields, ordered by name.
///
/// Two objects with the same field names and field types are the same
/// object, whatever order their fields were written in.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjType {
    fields: BTreeMap<String, Type>,
}

impl ObjType {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        ObjType {
            fields: fields.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = (&str, &Type)> {
        self.fields.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A Stela type descriptor.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    Any,
    Bool,
    /// Database address (index key): ordered components with a direction each.
    Addr(Vec<(AddrDir, Type)>),
    Dict(Box<Type>, Box<Type>),
    Err(Box<Type>),
    Func {
        params: Vec<Type>,
        ret: Box<Type>,
    },
    Id,
    Int,
    List(Box<Type>),
    /// A mutable slot in the database; `target` is the type stored there.
    Mutable {
        addr: Box<Type>,
        target: Box<Type>,
    },
    Obj(ObjType),
    Opt(Box<Type>),
    Real,
    Seq(Box<Type>),
    Set(Box<Type>),
    Str,
    TimeDiff,
    TimePnt,
}

impl Type {
    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    pub fn opt(elem: Type) -> Type {
        Type::Opt(Box::new(elem))
    }

    pub fn seq(elem: Type) -> Type {
        Type::Seq(Box::new(elem))
    }

    pub fn set(elem: Type) -> Type {
        Type::Set(Box::new(elem))
    }

    pub fn err(elem: Type) -> Type {
        Type::Err(Box::new(elem))
    }

    pub fn dict(key: Type, val: Type) -> Type {
        Type::Dict(Box::new(key), Box::new(val))
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Type {
        Type::Func {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn mutable(addr: Type, target: Type) -> Type {
        Type::Mutable {
            addr: Box::new(addr),
            target: Box::new(target),
        }
    }

    pub fn addr<I>(elems: I) -> Type
    where
        I: IntoIterator<Item = (AddrDir, Type)>,
    {
        Type::Addr(elems.into_iter().collect())
    }

    pub fn obj<I, S>(fields: I) -> Type
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        Type::Obj(ObjType::new(fields))
    }

    /// Strip any `Mutable` wrappers, yielding the type stored at the address.
    pub fn resolved(&self) -> &Type {
        match self {
            Type::Mutable { target, .. } => target.resolved(),
            other => other,
        }
    }

    pub fn is_seq(&self) -> bool {
        matches!(self.resolved(), Type::Seq(_))
    }

    pub fn is_addr(&self) -> bool {
        matches!(self.resolved(), Type::Addr(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.resolved(), Type::Int | Type::Real)
    }

    /// Element type of a sequence.
    pub fn seq_elem(&self) -> Option<&Type> {
        match self.resolved() {
            Type::Seq(elem) => Some(elem),
            _ => None,
        }
    }

    /// Components of an address type.
    pub fn addr_elems(&self) -> Option<&[(AddrDir, Type)]> {
        match self.resolved() {
            Type::Addr(elems) => Some(elems),
            _ => None,
        }
    }

    /// `true` if this type or any type nested in it satisfies `pred`.
    pub fn any(&self, pred: &impl Fn(&Type) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            type_leaf_pattern!() => false,
            Type::Addr(elems) => elems.iter().any(|(_, t)| t.any(pred)),
            Type::Dict(key, val) => key.any(pred) || val.any(pred),
            Type::Err(elem)
            | Type::List(elem)
            | Type::Opt(elem)
            | Type::Seq(elem)
            | Type::Set(elem) => elem.any(pred),
            Type::Func { params, ret } => params.iter().any(|p| p.any(pred)) || ret.any(pred),
            Type::Mutable { addr, target } => addr.any(pred) || target.any(pred),
            Type::Obj(obj) => obj.fields().any(|(_, t)| t.any(pred)),
        }
    }

    /// `true` if an `Err` or `Func` appears anywhere in this type.
    ///
    /// Such types have no runtime descriptor constructor.
    pub fn has_opaque_part(&self) -> bool {
        self.any(&|t| matches!(t, Type::Err(_) | Type::Func { .. }))
    }
}

#[cfg(test)]
mod tests;
