// Doodle Type System
// Element types, list types and the object attribute layout shared with the VM

use std::fmt;

/// Scalar and object element kinds. The declaration order doubles as the
/// order of the per-type segments inside every address region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float,
    Char,
    Bool,
    Int,
    String,
    Void,
    Square,
    Circle,
    Image,
    Text,
    Background,
}

/// Element types that own a segment of storage, in segment order.
pub const STORABLE_TYPES: [ElementType; 10] = [
    ElementType::Float,
    ElementType::Char,
    ElementType::Bool,
    ElementType::Int,
    ElementType::String,
    ElementType::Square,
    ElementType::Circle,
    ElementType::Image,
    ElementType::Text,
    ElementType::Background,
];

impl ElementType {
    /// One-character code used by canonical type strings and `Init` quads
    pub fn code(self) -> char {
        match self {
            ElementType::Float => '1',
            ElementType::Char => '2',
            ElementType::Bool => '3',
            ElementType::Int => '4',
            ElementType::String => '5',
            ElementType::Void => '6',
            ElementType::Square => '7',
            ElementType::Circle => '8',
            ElementType::Image => '9',
            ElementType::Text => 'a',
            ElementType::Background => 'b',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '1' => Some(ElementType::Float),
            '2' => Some(ElementType::Char),
            '3' => Some(ElementType::Bool),
            '4' => Some(ElementType::Int),
            '5' => Some(ElementType::String),
            '6' => Some(ElementType::Void),
            '7' => Some(ElementType::Square),
            '8' => Some(ElementType::Circle),
            '9' => Some(ElementType::Image),
            'a' => Some(ElementType::Text),
            'b' => Some(ElementType::Background),
            _ => None,
        }
    }

    /// Numeric form of the type code (the code read as a hex digit)
    pub fn code_value(self) -> i32 {
        self.code().to_digit(16).map(|d| d as i32).unwrap_or(-1)
    }

    pub fn from_code_value(value: i32) -> Option<Self> {
        let digit = u32::try_from(value).ok()?;
        std::char::from_digit(digit, 16).and_then(Self::from_code)
    }

    pub fn is_object(self) -> bool {
        matches!(
            self,
            ElementType::Square
                | ElementType::Circle
                | ElementType::Image
                | ElementType::Text
                | ElementType::Background
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ElementType::Int | ElementType::Float)
    }

    /// Index of this type's segment within a region; `None` for Void
    pub fn segment_index(self) -> Option<usize> {
        STORABLE_TYPES.iter().position(|t| *t == self)
    }

    pub fn from_segment_index(index: usize) -> Option<Self> {
        STORABLE_TYPES.get(index).copied()
    }

    /// Number of storage slots one value of this type occupies
    pub fn slot_width(self) -> usize {
        if self.is_object() {
            OBJECT_BLOCK_SIZE as usize
        } else {
            1
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ElementType::Float => "float",
            ElementType::Char => "char",
            ElementType::Bool => "bool",
            ElementType::Int => "int",
            ElementType::String => "string",
            ElementType::Void => "void",
            ElementType::Square => "square",
            ElementType::Circle => "circle",
            ElementType::Image => "image",
            ElementType::Text => "text",
            ElementType::Background => "background",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "float" => Some(ElementType::Float),
            "char" => Some(ElementType::Char),
            "bool" => Some(ElementType::Bool),
            "int" => Some(ElementType::Int),
            "string" => Some(ElementType::String),
            "void" => Some(ElementType::Void),
            "square" => Some(ElementType::Square),
            "circle" => Some(ElementType::Circle),
            "image" => Some(ElementType::Image),
            "text" => Some(ElementType::Text),
            "background" => Some(ElementType::Background),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A basic or object type with an optional list nesting.
///
/// Two types are equal when their canonical strings match, so the declared
/// list size takes no part in equality.
#[derive(Debug, Clone)]
pub struct Type {
    pub element: ElementType,
    pub list_depth: usize,
    pub size: usize,
}

impl Type {
    pub fn basic(element: ElementType) -> Self {
        Type {
            element,
            list_depth: 0,
            size: 0,
        }
    }

    pub fn list(element: ElementType, size: usize) -> Self {
        Type {
            element,
            list_depth: 1,
            size,
        }
    }

    pub fn int() -> Self {
        Self::basic(ElementType::Int)
    }

    pub fn float() -> Self {
        Self::basic(ElementType::Float)
    }

    pub fn bool() -> Self {
        Self::basic(ElementType::Bool)
    }

    pub fn void() -> Self {
        Self::basic(ElementType::Void)
    }

    pub fn is_list(&self) -> bool {
        self.list_depth > 0
    }

    pub fn is_void(&self) -> bool {
        self.element == ElementType::Void && !self.is_list()
    }

    pub fn is_object(&self) -> bool {
        self.element.is_object() && !self.is_list()
    }

    pub fn is_numeric(&self) -> bool {
        self.element.is_numeric() && !self.is_list()
    }

    /// Type of one element of this list type
    pub fn element_type(&self) -> Type {
        Type {
            element: self.element,
            list_depth: self.list_depth.saturating_sub(1),
            size: 0,
        }
    }

    /// Storage slots reserved for a variable of this type
    pub fn slot_count(&self) -> usize {
        let count = if self.is_list() { self.size } else { 1 };
        count * self.element.slot_width()
    }

    /// Canonical encoding: list brackets around the one-character code
    pub fn canonical(&self) -> String {
        let mut s = String::with_capacity(self.list_depth * 2 + 1);
        for _ in 0..self.list_depth {
            s.push('[');
        }
        s.push(self.element.code());
        for _ in 0..self.list_depth {
            s.push(']');
        }
        s
    }

    /// Whether a value of type `value` may be stored where `self` is expected.
    /// Int widens to Float; everything else must match exactly.
    pub fn accepts(&self, value: &Type) -> bool {
        self == value
            || (!self.is_list()
                && !value.is_list()
                && self.element == ElementType::Float
                && value.element == ElementType::Int)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Type {}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.element)?;
        if self.is_list() {
            write!(f, "[{}]", self.size)?;
        }
        Ok(())
    }
}

/// Fixed attributes every object block carries. The position in
/// `ALL_ATTRIBUTES` plus one is the attribute's offset inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Height,
    Width,
    X,
    Y,
    Size,
    Color,
    Message,
    Image,
}

pub const ALL_ATTRIBUTES: [Attribute; 8] = [
    Attribute::Height,
    Attribute::Width,
    Attribute::X,
    Attribute::Y,
    Attribute::Size,
    Attribute::Color,
    Attribute::Message,
    Attribute::Image,
];

/// Slot 0 addresses the object itself, 1..=8 its attributes
pub const OBJECT_BLOCK_SIZE: i32 = ALL_ATTRIBUTES.len() as i32 + 1;

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Height => "height",
            Attribute::Width => "width",
            Attribute::X => "x",
            Attribute::Y => "y",
            Attribute::Size => "size",
            Attribute::Color => "color",
            Attribute::Message => "message",
            Attribute::Image => "image",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_ATTRIBUTES.iter().copied().find(|a| a.name() == name)
    }

    pub fn offset(self) -> i32 {
        ALL_ATTRIBUTES
            .iter()
            .position(|a| *a == self)
            .map(|i| i as i32 + 1)
            .unwrap_or(0)
    }

    pub fn from_offset(offset: i32) -> Option<Self> {
        usize::try_from(offset - 1)
            .ok()
            .and_then(|i| ALL_ATTRIBUTES.get(i).copied())
    }

    pub fn value_type(self) -> ElementType {
        match self {
            Attribute::Height | Attribute::Width | Attribute::X | Attribute::Y | Attribute::Size => {
                ElementType::Float
            }
            Attribute::Color | Attribute::Message | Attribute::Image => ElementType::String,
        }
    }
}

/// Attributes a given object type exposes to programs
pub fn attributes_for(element: ElementType) -> &'static [Attribute] {
    use Attribute::*;
    match element {
        ElementType::Square | ElementType::Circle => &[X, Y, Width, Height, Color],
        ElementType::Image | ElementType::Background => &[X, Y, Width, Height, Image],
        ElementType::Text => &[X, Y, Size, Color, Message],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_canonical_strings() {
        assert_eq!(Type::int().canonical(), "4");
        assert_eq!(Type::list(ElementType::Text, 3).canonical(), "[a]");
        assert_eq!(Type::list(ElementType::Int, 3), Type::list(ElementType::Int, 7));
        assert_ne!(Type::list(ElementType::Int, 3), Type::int());
    }

    #[test]
    fn test_attribute_offsets() {
        assert_eq!(OBJECT_BLOCK_SIZE, 9);
        assert_eq!(Attribute::Height.offset(), 1);
        assert_eq!(Attribute::Image.offset(), 8);
        assert_eq!(Attribute::from_offset(3), Some(Attribute::X));
        assert_eq!(Attribute::from_offset(0), None);
        assert_eq!(Attribute::from_offset(9), None);
    }

    #[test]
    fn test_type_code_values() {
        assert_eq!(ElementType::Text.code_value(), 10);
        assert_eq!(ElementType::from_code_value(11), Some(ElementType::Background));
        assert_eq!(ElementType::from_code_value(-1), None);
    }

    #[test]
    fn test_slot_counts() {
        assert_eq!(Type::int().slot_count(), 1);
        assert_eq!(Type::list(ElementType::Int, 4).slot_count(), 4);
        assert_eq!(Type::basic(ElementType::Square).slot_count(), 9);
        assert_eq!(Type::list(ElementType::Circle, 2).slot_count(), 18);
    }
}
