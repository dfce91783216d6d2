//! Virtual machine state: segmented memory, values and activation records
//!
//! Memory mirrors the compiler's address layout. Each region is a sparse
//! map from address to value; a slot that was never written (or was reset
//! by `Init`) reads as the zero value of the type its address encodes.

use crate::compiler::address_space::{
    locate, segment_base, Address, ConstantEntry, Location, Region, ALL_REGIONS, SEGMENT_SIZE,
};
use crate::compiler::lexer::unquote;
use crate::compiler::quad::{Quadruple, QuadrupleProgram};
use crate::compiler::types::{Attribute, ElementType, OBJECT_BLOCK_SIZE, STORABLE_TYPES};
use crate::interpreter::RuntimeError;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// A runtime value held in one memory slot
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Char(char),
    Bool(bool),
    Str(String),
    /// Slot 0 of an object block
    Object(ElementType),
}

impl Value {
    /// Zero value for a slot of the given kind
    pub fn default_for(kind: ElementType) -> Value {
        match kind {
            ElementType::Float => Value::Float(0.0),
            ElementType::Char => Value::Char('a'),
            ElementType::Bool => Value::Bool(false),
            ElementType::Int => Value::Int(0),
            ElementType::String => Value::Str("-".to_string()),
            other => Value::Object(other),
        }
    }

    pub fn kind(&self) -> ElementType {
        match self {
            Value::Int(_) => ElementType::Int,
            Value::Float(_) => ElementType::Float,
            Value::Char(_) => ElementType::Char,
            Value::Bool(_) => ElementType::Bool,
            Value::Str(_) => ElementType::String,
            Value::Object(kind) => *kind,
        }
    }

    /// Parse constant pool text for the given element type
    pub fn from_literal(text: &str, element: ElementType) -> Option<Value> {
        match element {
            ElementType::Int => text.parse().ok().map(Value::Int),
            ElementType::Float => text.parse().ok().map(Value::Float),
            ElementType::Bool => match text {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ElementType::Char => {
                let inner = unquote(text, '\'')?;
                let mut chars = inner.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some(Value::Char(ch)),
                    _ => None,
                }
            }
            ElementType::String => unquote(text, '"').map(Value::Str),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Value::Float(x) => write!(f, "{:.6}", x),
            Value::Char(c) => write!(f, "{}", c),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(kind) => write!(f, "<{}>", kind),
        }
    }
}

/// Kind of value a slot holds. Inside object segments slot 0 of each
/// block is the object itself and the rest are its attributes.
pub fn slot_kind(location: &Location) -> ElementType {
    if !location.element.is_object() {
        return location.element;
    }
    match location.offset % OBJECT_BLOCK_SIZE {
        0 => location.element,
        within => Attribute::from_offset(within)
            .map(Attribute::value_type)
            .unwrap_or(location.element),
    }
}

pub fn is_block_base(location: &Location) -> bool {
    location.element.is_object() && location.offset % OBJECT_BLOCK_SIZE == 0
}

fn coerce(address: Address, kind: ElementType, value: Value) -> Result<Value, RuntimeError> {
    match (kind, value) {
        (ElementType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (kind, value) if value.kind() == kind => Ok(value),
        (expected, value) => Err(RuntimeError::TypeCoercion {
            address,
            expected,
            found: value.kind(),
        }),
    }
}

/// Saved Local and Temp regions of a suspended call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    local: HashMap<Address, Value>,
    temp: HashMap<Address, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Memory {
    regions: [HashMap<Address, Value>; ALL_REGIONS.len()],
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the Constant region from the program's pool
    pub fn load_constants(&mut self, constants: &[ConstantEntry]) -> Result<(), RuntimeError> {
        for entry in constants {
            let value = Value::from_literal(&entry.text, entry.element).ok_or_else(|| {
                RuntimeError::InvalidInstruction(format!(
                    "constant {} is not a valid {}",
                    entry.text, entry.element
                ))
            })?;
            let location = Self::locate(entry.address)?;
            if location.region != Region::Constant {
                return Err(RuntimeError::InvalidAddress(entry.address));
            }
            let value = coerce(entry.address, slot_kind(&location), value)?;
            self.regions[Region::Constant.index()].insert(entry.address, value);
        }
        debug!("loaded {} constants", constants.len());
        Ok(())
    }

    pub fn locate(address: Address) -> Result<Location, RuntimeError> {
        locate(address).ok_or(RuntimeError::InvalidAddress(address))
    }

    pub fn read(&self, address: Address) -> Result<Value, RuntimeError> {
        let location = Self::locate(address)?;
        Ok(self.regions[location.region.index()]
            .get(&address)
            .cloned()
            .unwrap_or_else(|| Value::default_for(slot_kind(&location))))
    }

    /// Store `value`, widening Int into Float slots
    pub fn write(&mut self, address: Address, value: Value) -> Result<(), RuntimeError> {
        let location = Self::locate(address)?;
        if location.region == Region::Constant {
            return Err(RuntimeError::InvalidAddress(address));
        }
        let value = coerce(address, slot_kind(&location), value)?;
        self.regions[location.region.index()].insert(address, value);
        Ok(())
    }

    pub fn read_block(&self, address: Address, len: usize) -> Result<Vec<Value>, RuntimeError> {
        (0..len as Address).map(|i| self.read(address + i)).collect()
    }

    pub fn write_block(&mut self, address: Address, values: Vec<Value>) -> Result<(), RuntimeError> {
        for (i, value) in values.into_iter().enumerate() {
            self.write(address + i as Address, value)?;
        }
        Ok(())
    }

    /// Slots one value starting at `address` spans
    pub fn width_at(&self, address: Address) -> Result<usize, RuntimeError> {
        let location = Self::locate(address)?;
        Ok(if is_block_base(&location) {
            OBJECT_BLOCK_SIZE as usize
        } else {
            1
        })
    }

    /// Copy one value; object values move as whole blocks
    pub fn copy(&mut self, from: Address, to: Address) -> Result<(), RuntimeError> {
        let values = self.read_block(from, self.width_at(from)?)?;
        self.write_block(to, values)
    }

    /// Return `count` slots to their zero values
    pub fn reset(&mut self, address: Address, count: usize) -> Result<(), RuntimeError> {
        let location = Self::locate(address)?;
        if location.region == Region::Constant {
            return Err(RuntimeError::InvalidAddress(address));
        }
        let region = &mut self.regions[location.region.index()];
        for i in 0..count as Address {
            region.remove(&(address + i));
        }
        Ok(())
    }

    /// Copy of the Local and Temp regions. The regions themselves stay as
    /// they are: a callee shares them with its caller until `restore_frame`.
    pub fn snapshot_frame(&self) -> Frame {
        Frame {
            local: self.regions[Region::Local.index()].clone(),
            temp: self.regions[Region::Temp.index()].clone(),
        }
    }

    pub fn restore_frame(&mut self, frame: Frame) {
        self.regions[Region::Local.index()] = frame.local;
        self.regions[Region::Temp.index()] = frame.temp;
    }

    /// Slots currently holding a written value in `region`
    pub fn used(&self, region: Region) -> usize {
        self.regions[region.index()].len()
    }
}

/// One function invocation. Created by `Era`, filled by `Param`, entered by
/// `Call`; holds the caller's frame while a callee runs.
#[derive(Debug, Clone)]
pub struct ActivationRecord {
    pub footprint: usize,
    /// Index of the `Call` quad that entered this record
    pub retip: usize,
    staged: Vec<(Address, Vec<Value>)>,
    counters: [i32; STORABLE_TYPES.len()],
    saved: Option<Frame>,
}

impl ActivationRecord {
    pub fn new(footprint: usize) -> Self {
        ActivationRecord {
            footprint,
            retip: 0,
            staged: Vec::new(),
            counters: [0; STORABLE_TYPES.len()],
            saved: None,
        }
    }

    /// Queue a parameter. Parameters of one kind fill the callee's Local
    /// segment for that kind in order, matching declaration-order allocation.
    pub fn stage_param(&mut self, kind: ElementType, values: Vec<Value>) -> Result<(), RuntimeError> {
        let (Some(index), Some(base)) = (kind.segment_index(), segment_base(Region::Local, kind))
        else {
            return Err(RuntimeError::InvalidInstruction(format!(
                "cannot pass a value of type {}",
                kind
            )));
        };
        let counter = &mut self.counters[index];
        let address = base + *counter;
        if *counter + values.len() as i32 > SEGMENT_SIZE {
            return Err(RuntimeError::InvalidAddress(address));
        }
        *counter += values.len() as i32;
        self.staged.push((address, values));
        Ok(())
    }

    pub fn take_params(&mut self) -> Vec<(Address, Vec<Value>)> {
        std::mem::take(&mut self.staged)
    }

    pub fn suspend(&mut self, frame: Frame) {
        self.saved = Some(frame);
    }

    pub fn resume(&mut self) -> Option<Frame> {
        self.saved.take()
    }
}

/// Executable state of a loaded program
pub struct VM {
    pub quads: Vec<Quadruple>,
    pub ip: usize,
    pub memory: Memory,
    /// Active invocations; the root record belongs to the entry function
    pub call_stack: Vec<ActivationRecord>,
    /// Records between `Era` and `Call`, innermost last
    pub pending: Vec<ActivationRecord>,
}

impl VM {
    pub fn new(program: QuadrupleProgram) -> Result<Self, RuntimeError> {
        let mut memory = Memory::new();
        memory.load_constants(&program.constants)?;

        let mut root = ActivationRecord::new(0);
        root.retip = program.quads.len();

        Ok(VM {
            quads: program.quads,
            ip: 0,
            memory,
            call_stack: vec![root],
            pending: Vec::new(),
        })
    }

    /// Reset execution to the first quad with fresh variable storage
    pub fn reset(&mut self) {
        let constants = std::mem::take(&mut self.memory.regions[Region::Constant.index()]);
        self.memory = Memory::new();
        self.memory.regions[Region::Constant.index()] = constants;
        self.ip = 0;
        let mut root = ActivationRecord::new(0);
        root.retip = self.quads.len();
        self.call_stack = vec![root];
        self.pending.clear();
    }

    pub fn read(&self, address: Address) -> Result<Value, RuntimeError> {
        self.memory.read(address)
    }

    pub fn write(&mut self, address: Address, value: Value) -> Result<(), RuntimeError> {
        self.memory.write(address, value)
    }

    /// Read an address stored as an Int by `AddAddr`
    pub fn read_pointer(&self, address: Address) -> Result<Address, RuntimeError> {
        let value = self.read(address)?;
        value
            .as_int()
            .and_then(|p| Address::try_from(p).ok())
            .ok_or(RuntimeError::TypeCoercion {
                address,
                expected: ElementType::Int,
                found: value.kind(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::address_space::AddressSpace;
    use crate::compiler::types::Type;
    use test_log::test;

    #[test]
    fn test_unset_slots_read_as_defaults() {
        let memory = Memory::new();
        assert_eq!(memory.read(0).unwrap(), Value::Float(0.0));
        assert_eq!(memory.read(13000).unwrap(), Value::Int(0));
        assert_eq!(memory.read(24000).unwrap(), Value::Str("-".to_string()));
        assert_eq!(memory.read(5000).unwrap(), Value::Object(ElementType::Square));
        // Square at 5000: offset 3 is x, offset 6 is color
        assert_eq!(memory.read(5003).unwrap(), Value::Float(0.0));
        assert_eq!(memory.read(5006).unwrap(), Value::Str("-".to_string()));
        assert!(matches!(memory.read(-1), Err(RuntimeError::InvalidAddress(-1))));
    }

    #[test]
    fn test_int_widens_into_float_slot() {
        let mut memory = Memory::new();
        memory.write(10000, Value::Int(3)).unwrap();
        assert_eq!(memory.read(10000).unwrap(), Value::Float(3.0));
        memory.write(6004, Value::Int(7)).unwrap();
        assert_eq!(memory.read(6004).unwrap(), Value::Float(7.0));
    }

    #[test]
    fn test_mismatched_write_rejected() {
        let mut memory = Memory::new();
        let err = memory.write(3000, Value::Float(1.5)).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::TypeCoercion {
                expected: ElementType::Int,
                found: ElementType::Float,
                ..
            }
        ));
        assert!(memory.write(30000, Value::Float(1.0)).is_err());
    }

    #[test]
    fn test_object_copy_moves_block() {
        let mut memory = Memory::new();
        memory.write(5003, Value::Float(4.0)).unwrap();
        memory.write(5006, Value::Str("red".to_string())).unwrap();
        memory.copy(5000, 5009).unwrap();
        assert_eq!(memory.read(5012).unwrap(), Value::Float(4.0));
        assert_eq!(memory.read(5015).unwrap(), Value::Str("red".to_string()));
        assert_eq!(memory.width_at(5009).unwrap(), 9);
        assert_eq!(memory.width_at(5012).unwrap(), 1);
    }

    #[test]
    fn test_frame_restore_covers_local_and_temp() {
        let mut memory = Memory::new();
        memory.write(13000, Value::Int(1)).unwrap();
        memory.write(23000, Value::Int(2)).unwrap();
        memory.write(3000, Value::Int(3)).unwrap();

        let frame = memory.snapshot_frame();
        memory.write(13000, Value::Int(50)).unwrap();
        memory.write(23000, Value::Int(99)).unwrap();
        memory.write(3000, Value::Int(4)).unwrap();

        memory.restore_frame(frame);
        assert_eq!(memory.read(13000).unwrap(), Value::Int(1));
        assert_eq!(memory.read(23000).unwrap(), Value::Int(2));
        // Globals are not part of a frame
        assert_eq!(memory.read(3000).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_constants_load_from_pool() {
        let mut space = AddressSpace::new();
        let hello = space.add_constant("\"hi \\\"you\\\"\"", &Type::basic(ElementType::String)).unwrap();
        let neg = space.add_constant("-3", &Type::int()).unwrap();
        let mut memory = Memory::new();
        memory.load_constants(&space.constants()).unwrap();

        assert_eq!(memory.read(30000).unwrap(), Value::Float(0.0));
        assert_eq!(memory.read(31000).unwrap(), Value::Char('a'));
        assert_eq!(memory.read(hello).unwrap(), Value::Str("hi \"you\"".to_string()));
        assert_eq!(memory.read(neg).unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_params_fill_segments_in_order() {
        let mut record = ActivationRecord::new(3);
        record.stage_param(ElementType::Int, vec![Value::Int(1)]).unwrap();
        record.stage_param(ElementType::Float, vec![Value::Float(2.0)]).unwrap();
        record.stage_param(ElementType::Int, vec![Value::Int(3)]).unwrap();
        let params = record.take_params();
        let addresses: Vec<Address> = params.iter().map(|(a, _)| *a).collect();
        assert_eq!(addresses, vec![13000, 10000, 13001]);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Float(5.0).to_string(), "5");
        assert_eq!(Value::Float(2.5).to_string(), "2.500000");
        assert_eq!(Value::Float(1.0 / 3.0).to_string(), "0.333333");
        assert_eq!(Value::Float(-0.25).to_string(), "-0.250000");
        assert_eq!(Value::Char('z').to_string(), "z");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }
}
