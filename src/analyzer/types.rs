use std::fmt;

use crate::ast::{PrimitiveType, TypeAnnotation};

/// Static type of an expression or binding.
///
/// `Any` only ever appears as the element type of an empty array literal
/// before it is unified with a declared array type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Bool,
    Char,
    String,
    Any,
    Array(Box<Type>),
}

impl Type {
    pub fn array_of(element: Type) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Whether a value of type `found` may initialize a binding of this type.
    /// An empty array literal fits any array type.
    pub fn accepts(&self, found: &Type) -> bool {
        match (self, found) {
            (Self::Array(_), Self::Array(element)) if **element == Self::Any => true,
            _ => self == found,
        }
    }
}

impl From<PrimitiveType> for Type {
    fn from(primitive: PrimitiveType) -> Self {
        match primitive {
            PrimitiveType::Int => Self::Int,
            PrimitiveType::Float => Self::Float,
            PrimitiveType::Bool => Self::Bool,
            PrimitiveType::Char => Self::Char,
            PrimitiveType::String => Self::String,
        }
    }
}

impl From<TypeAnnotation> for Type {
    fn from(annotation: TypeAnnotation) -> Self {
        match annotation {
            TypeAnnotation::Primitive(base) => base.into(),
            TypeAnnotation::Array(base) => Self::array_of(base.into()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Bool => f.write_str("bool"),
            Self::Char => f.write_str("char"),
            Self::String => f.write_str("string"),
            Self::Any => f.write_str("any"),
            Self::Array(element) => write!(f, "{element}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_array_fits_any_declared_array() {
        let declared = Type::array_of(Type::Char);
        assert!(declared.accepts(&Type::array_of(Type::Any)));
        assert!(declared.accepts(&Type::array_of(Type::Char)));
        assert!(!declared.accepts(&Type::array_of(Type::Int)));
        assert!(!Type::Int.accepts(&Type::array_of(Type::Any)));
    }

    #[test]
    fn renders_like_source_annotations() {
        assert_eq!(Type::from(TypeAnnotation::Array(PrimitiveType::Float)).to_string(), "float[]");
        assert_eq!(Type::array_of(Type::Any).to_string(), "any[]");
    }
}
