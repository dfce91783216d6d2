// Address space allocator tests

use crate::compiler::address_space::*;
use crate::compiler::error::CompilerError;
use crate::compiler::types::{ElementType, Type, OBJECT_BLOCK_SIZE};
use test_log::test;

#[test]
fn test_bases_combine_region_and_type() {
    let mut space = AddressSpace::new();
    assert_eq!(space.next_global(&Type::float()).unwrap(), 0);
    assert_eq!(space.next_global(&Type::int()).unwrap(), 3000);
    assert_eq!(space.next_local(&Type::int()).unwrap(), 13000);
    assert_eq!(
        space.next_temp(&Type::basic(ElementType::String)).unwrap(),
        24000
    );
    assert_eq!(
        space.next_global(&Type::basic(ElementType::Background)).unwrap(),
        9000
    );
}

#[test]
fn test_addresses_increase_in_request_order() {
    let mut space = AddressSpace::new();
    let a = space.next_local(&Type::int()).unwrap();
    let b = space.next_local(&Type::int()).unwrap();
    let c = space.next_local(&Type::int()).unwrap();
    assert!(a < b && b < c);
    assert_eq!(c - a, 2);
}

#[test]
fn test_lists_and_objects_reserve_blocks() {
    let mut space = AddressSpace::new();
    let list = space.next_global(&Type::list(ElementType::Int, 5)).unwrap();
    let after = space.next_global(&Type::int()).unwrap();
    assert_eq!(after - list, 5);

    let first = space.next_global(&Type::basic(ElementType::Circle)).unwrap();
    let second = space.next_global(&Type::basic(ElementType::Circle)).unwrap();
    assert_eq!(second - first, OBJECT_BLOCK_SIZE);

    let boxes = space
        .next_global(&Type::list(ElementType::Circle, 3))
        .unwrap();
    let next = space.next_global(&Type::basic(ElementType::Circle)).unwrap();
    assert_eq!(next - boxes, 3 * OBJECT_BLOCK_SIZE);
}

#[test]
fn test_allocation_exhaustion() {
    let mut space = AddressSpace::new();
    for i in 0..1000 {
        assert_eq!(space.next_temp(&Type::bool()).unwrap(), 22000 + i);
    }
    assert!(matches!(
        space.next_temp(&Type::bool()),
        Err(CompilerError::AllocationExceeded(_))
    ));
    // Other buckets are unaffected
    assert!(space.next_temp(&Type::int()).is_ok());
}

#[test]
fn test_oversized_list_rejected() {
    let mut space = AddressSpace::new();
    assert!(matches!(
        space.next_global(&Type::list(ElementType::Square, 112)),
        Err(CompilerError::AllocationExceeded(_))
    ));
    assert!(space
        .next_global(&Type::list(ElementType::Square, 111))
        .is_ok());
}

#[test]
fn test_resets_only_touch_their_region() {
    let mut space = AddressSpace::new();
    space.next_global(&Type::int()).unwrap();
    space.next_local(&Type::int()).unwrap();
    space.next_temp(&Type::int()).unwrap();
    space.reset_local();
    space.reset_temp();
    assert_eq!(space.next_local(&Type::int()).unwrap(), 13000);
    assert_eq!(space.next_temp(&Type::int()).unwrap(), 23000);
    assert_eq!(space.next_global(&Type::int()).unwrap(), 3001);
}

#[test]
fn test_void_temp_is_unused() {
    let mut space = AddressSpace::new();
    assert_eq!(space.next_temp(&Type::void()).unwrap(), UNUSED_ADDRESS);
}

#[test]
fn test_constant_dedup() {
    let mut space = AddressSpace::new();
    let five = space.add_constant("5", &Type::int()).unwrap();
    assert_eq!(space.add_constant("5", &Type::int()).unwrap(), five);
    let six = space.add_constant("6", &Type::int()).unwrap();
    assert_ne!(five, six);
    // Same text, different type
    let float_five = space.add_constant("5", &Type::float()).unwrap();
    assert_ne!(float_five, five);
}

#[test]
fn test_default_constants() {
    let space = AddressSpace::new();
    assert_eq!(space.default_address(&Type::float()), 30000);
    assert_eq!(space.default_address(&Type::int()), 33000);
    assert_eq!(space.default_address(&Type::basic(ElementType::String)), 34000);
    assert_eq!(space.default_address(&Type::void()), UNUSED_ADDRESS);
    let texts: Vec<_> = space.constants().into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["0.0", "'a'", "false", "0", "\"-\""]);
}

#[test]
fn test_default_literal_reuses_default_slot() {
    let mut space = AddressSpace::new();
    assert_eq!(space.add_constant("0", &Type::int()).unwrap(), 33000);
}

#[test]
fn test_locate() {
    let loc = locate(25000 + 18 + 3).unwrap();
    assert_eq!(loc.region, Region::Temp);
    assert_eq!(loc.element, ElementType::Square);
    assert_eq!(loc.offset, 21);
    assert!(locate(-1).is_none());
    assert!(locate(50000).is_none());
    assert_eq!(locate(49999).map(|l| l.region), Some(Region::Scope));
}
