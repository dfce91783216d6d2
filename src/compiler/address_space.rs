// Virtual Address Space
// Region/type bucketed allocator and the deduplicated constant pool

use crate::compiler::error::CompilerError;
use crate::compiler::types::{ElementType, Type, STORABLE_TYPES};
use indexmap::IndexMap;
use log::debug;

pub type Address = i32;

/// Marks an unused operand
pub const UNUSED_ADDRESS: Address = -1;

/// Capacity of one (region, element type) bucket
pub const SEGMENT_SIZE: i32 = 1000;
pub const REGION_SIZE: i32 = SEGMENT_SIZE * STORABLE_TYPES.len() as i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Global,
    Local,
    Temp,
    Constant,
    Scope,
}

pub const ALL_REGIONS: [Region; 5] = [
    Region::Global,
    Region::Local,
    Region::Temp,
    Region::Constant,
    Region::Scope,
];

impl Region {
    pub fn index(self) -> usize {
        match self {
            Region::Global => 0,
            Region::Local => 1,
            Region::Temp => 2,
            Region::Constant => 3,
            Region::Scope => 4,
        }
    }

    pub fn base(self) -> Address {
        self.index() as Address * REGION_SIZE
    }
}

/// Where an address lives: region, element segment and offset in the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub region: Region,
    pub element: ElementType,
    pub offset: i32,
}

pub fn segment_base(region: Region, element: ElementType) -> Option<Address> {
    element
        .segment_index()
        .map(|i| region.base() + i as Address * SEGMENT_SIZE)
}

pub fn locate(address: Address) -> Option<Location> {
    if address < 0 {
        return None;
    }
    let region = *ALL_REGIONS.get((address / REGION_SIZE) as usize)?;
    let within = address % REGION_SIZE;
    let element = ElementType::from_segment_index((within / SEGMENT_SIZE) as usize)?;
    Some(Location {
        region,
        element,
        offset: within % SEGMENT_SIZE,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantEntry {
    pub text: String,
    pub element: ElementType,
    pub address: Address,
}

/// Zero values interned before anything else, in this order
const DEFAULT_CONSTANTS: [(&str, ElementType); 5] = [
    ("0.0", ElementType::Float),
    ("'a'", ElementType::Char),
    ("false", ElementType::Bool),
    ("0", ElementType::Int),
    ("\"-\"", ElementType::String),
];

#[derive(Debug, Clone)]
pub struct AddressSpace {
    counters: [[i32; STORABLE_TYPES.len()]; ALL_REGIONS.len()],
    constants: IndexMap<(ElementType, String), ConstantEntry>,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    pub fn new() -> Self {
        let mut space = AddressSpace {
            counters: [[0; STORABLE_TYPES.len()]; ALL_REGIONS.len()],
            constants: IndexMap::new(),
        };
        for (text, element) in DEFAULT_CONSTANTS {
            // A fresh pool always has room for the defaults
            let _ = space.add_constant(text, &Type::basic(element));
        }
        space
    }

    /// Reserve storage for one value of `ty` in `region`. Lists reserve
    /// their declared size, object values a whole attribute block.
    pub fn next(&mut self, region: Region, ty: &Type) -> Result<Address, CompilerError> {
        let element = ty.element;
        let (Some(type_index), Some(base)) = (element.segment_index(), segment_base(region, element))
        else {
            return Err(CompilerError::CodeGenError(format!(
                "cannot allocate storage for type {}",
                ty
            )));
        };

        let amount = ty.slot_count() as i32;
        let counter = &mut self.counters[region.index()][type_index];
        if *counter + amount > SEGMENT_SIZE {
            return Err(CompilerError::AllocationExceeded(format!(
                "{:?} {}",
                region, element
            )));
        }

        let address = base + *counter;
        *counter += amount;
        debug!("allocated {:?} {} ({} slots) at {}", region, ty, amount, address);
        Ok(address)
    }

    pub fn next_global(&mut self, ty: &Type) -> Result<Address, CompilerError> {
        self.next(Region::Global, ty)
    }

    pub fn next_local(&mut self, ty: &Type) -> Result<Address, CompilerError> {
        self.next(Region::Local, ty)
    }

    /// Void temporaries have no storage and yield the unused address
    pub fn next_temp(&mut self, ty: &Type) -> Result<Address, CompilerError> {
        if ty.is_void() {
            return Ok(UNUSED_ADDRESS);
        }
        self.next(Region::Temp, ty)
    }

    pub fn reset_local(&mut self) {
        self.counters[Region::Local.index()] = [0; STORABLE_TYPES.len()];
    }

    pub fn reset_temp(&mut self) {
        self.counters[Region::Temp.index()] = [0; STORABLE_TYPES.len()];
    }

    /// Slots handed out so far in one bucket
    pub fn used(&self, region: Region, element: ElementType) -> i32 {
        element
            .segment_index()
            .map(|i| self.counters[region.index()][i])
            .unwrap_or(0)
    }

    /// Intern a literal; the same (type, text) pair always maps to one address
    pub fn add_constant(&mut self, text: &str, ty: &Type) -> Result<Address, CompilerError> {
        let key = (ty.element, text.to_string());
        if let Some(entry) = self.constants.get(&key) {
            return Ok(entry.address);
        }

        let address = self.next(Region::Constant, ty)?;
        self.constants.insert(
            key,
            ConstantEntry {
                text: text.to_string(),
                element: ty.element,
                address,
            },
        );
        Ok(address)
    }

    pub fn default_address(&self, ty: &Type) -> Address {
        DEFAULT_CONSTANTS
            .iter()
            .find(|(_, element)| *element == ty.element && !ty.is_list())
            .and_then(|(text, element)| self.constants.get(&(*element, text.to_string())))
            .map(|entry| entry.address)
            .unwrap_or(UNUSED_ADDRESS)
    }

    /// The constant table in interning order
    pub fn constants(&self) -> Vec<ConstantEntry> {
        self.constants.values().cloned().collect()
    }
}
