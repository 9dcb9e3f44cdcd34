//! End-to-end allocation scenarios on the default 4 MB / 1 KB allocator

use buddysim::buddy::{BuddyAllocator, Geometry, KB};
use buddysim::error::{Error, Result};

#[test]
fn test_initial_report() {
    let allocator = BuddyAllocator::new();
    let report = allocator.report();

    assert!(report.occupied.is_empty());
    assert_eq!(report.free_fragments, 1);
    assert_eq!(report.free_kb, 4096);
}

#[test]
fn test_single_allocation_splits_region() -> Result<()> {
    let mut allocator = BuddyAllocator::new();

    let allocation = allocator.allocate(1000, 'A')?;
    assert_eq!(allocation.block_kb, 1024);

    let report = allocator.report();
    assert_eq!(report.free_fragments, 2);
    assert_eq!(report.free_kb, 1024 + 2048);

    let mut fragment_sizes: Vec<_> = report
        .free_lists
        .iter()
        .flat_map(|list| list.slots.iter().map(move |_| list.block_kb))
        .collect();
    fragment_sizes.sort_unstable();
    assert_eq!(fragment_sizes, vec![1024, 2048]);

    allocator.check_invariants()
}

#[test]
fn test_oversize_request_fails_without_mutation() -> Result<()> {
    let mut allocator = BuddyAllocator::new();
    allocator.allocate(1000, 'A')?;

    let before = allocator.report();
    for _ in 0..3 {
        let err = allocator.allocate(5000, 'X').unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { label: 'X', size_kb: 5000 }));
        assert_eq!(allocator.report(), before);
    }

    allocator.check_invariants()
}

#[test]
fn test_whole_region_then_exhausted() -> Result<()> {
    let mut allocator = BuddyAllocator::new();

    let first = allocator.allocate(4096, 'A')?;
    assert_eq!(first.slot, 0);
    assert_eq!(first.block_kb, 4096);

    assert!(allocator.allocate(4096, 'B').is_err());

    let report = allocator.report();
    assert_eq!(report.free_fragments, 0);
    assert_eq!(report.free_kb, 0);
    assert!(report.free_lists.iter().all(|list| list.slots.is_empty()));

    allocator.check_invariants()
}

#[test]
fn test_block_size_is_smallest_fitting_power() -> Result<()> {
    let mut allocator = BuddyAllocator::new();

    for (size_kb, expected_kb) in [(1, 1), (2, 2), (3, 4), (5, 8), (100, 128), (129, 256), (512, 512)] {
        let allocation = allocator.allocate(size_kb, 'P')?;
        assert_eq!(allocation.block_kb, expected_kb, "request of {} KB", size_kb);
        assert_eq!(allocation.slot % (expected_kb as usize), 0);
    }

    allocator.check_invariants()
}

#[test]
fn test_invariants_hold_after_every_request() -> Result<()> {
    let mut allocator = BuddyAllocator::new();

    // deterministic mix of sizes, enough to exhaust the region
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    for i in 0..400 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let size_kb = (seed % 300) as i64;
        let label = (b'A' + (i % 26) as u8) as char;

        let before = allocator.report();
        match allocator.allocate(size_kb, label) {
            Ok(allocation) => {
                let expected = Geometry::default().block_kb(Geometry::default().target_level(size_kb));
                assert_eq!(allocation.block_kb, expected);
            }
            Err(Error::OutOfMemory { .. }) => assert_eq!(allocator.report(), before),
            Err(e) => return Err(e),
        }

        allocator.check_invariants()?;
        let report = allocator.report();
        let occupied_kb: u64 = report.occupied.iter().map(|block| block.block_kb).sum();
        assert_eq!(occupied_kb + report.free_kb, 4096);
    }

    Ok(())
}

#[test]
fn test_report_is_repeatable() -> Result<()> {
    let mut allocator = BuddyAllocator::new();
    allocator.allocate(70, 'A')?;
    allocator.allocate(35, 'B')?;
    allocator.allocate(80, 'C')?;

    assert_eq!(allocator.report().to_string(), allocator.report().to_string());
    Ok(())
}

#[test]
fn test_custom_geometry() -> Result<()> {
    let mut allocator = BuddyAllocator::with_geometry(Geometry::new(64 * KB, 4 * KB)?);

    let allocation = allocator.allocate(5, 'A')?;
    assert_eq!(allocation.block_kb, 8);

    let report = allocator.report();
    assert_eq!(report.total_kb, 64);
    assert_eq!(report.free_kb, 56);
    assert_eq!(report.free_lists.len(), 5);

    allocator.check_invariants()
}
