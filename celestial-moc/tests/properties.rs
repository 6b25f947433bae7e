use approx::assert_abs_diff_eq;
use celestial_moc::healpix::npix;
use celestial_moc::io::{read_fits, write_fits};
use celestial_moc::{Cell, Moc, MocConfig};
use proptest::prelude::*;
use std::io::Cursor;

fn cells() -> impl Strategy<Value = Vec<Cell>> {
    prop::collection::vec((0u8..=7, any::<u64>()), 0..40).prop_map(|raw| {
        raw.into_iter()
            .map(|(order, n)| Cell::new(order, n % npix(order)).unwrap())
            .collect()
    })
}

fn arb_moc() -> impl Strategy<Value = Moc> {
    cells().prop_map(|cells| Moc::from_cells(cells).unwrap())
}

/// MOCs built under a random `[min, max]` limit-order window.
fn arb_windowed_moc() -> impl Strategy<Value = Moc> {
    let window = (0u8..=6).prop_flat_map(|min| (Just(min), min..=29u8));
    (cells(), window).prop_map(|(cells, (min, max))| {
        let config = MocConfig {
            min_limit_order: min,
            max_limit_order: max,
            ..MocConfig::default()
        };
        let mut moc = Moc::with_config(&config).unwrap();
        moc.add_cells(cells).unwrap();
        moc
    })
}

proptest! {
    #[test]
    fn prop_union_commutes(a in arb_moc(), b in arb_moc()) {
        prop_assert_eq!(a.union(&b).unwrap(), b.union(&a).unwrap());
    }

    #[test]
    fn prop_intersection_commutes(a in arb_moc(), b in arb_moc()) {
        prop_assert_eq!(a.intersection(&b).unwrap(), b.intersection(&a).unwrap());
    }

    #[test]
    fn prop_text_round_trip(m in arb_moc()) {
        prop_assert_eq!(Moc::from_text(&m.to_json()).unwrap(), m.clone());
        prop_assert_eq!(Moc::from_text(&m.to_ascii()).unwrap(), m);
    }

    #[test]
    fn prop_windowed_text_round_trip(m in arb_windowed_moc()) {
        let back = Moc::from_text(&m.to_json()).unwrap();
        prop_assert_eq!(back.coverage(), m.coverage());
        prop_assert_eq!(&back, &m);
        prop_assert_eq!(Moc::from_text(&m.to_ascii()).unwrap(), m);
    }

    #[test]
    fn prop_fits_round_trip(m in arb_windowed_moc(), compressed in any::<bool>()) {
        let mut bytes = Vec::new();
        write_fits(&m, &mut bytes, compressed).unwrap();
        prop_assert_eq!(read_fits(Cursor::new(bytes)).unwrap(), m);
    }

    #[test]
    fn prop_subtraction_and_intersection_partition(a in arb_moc(), b in arb_moc()) {
        let outside = a.subtraction(&b).unwrap();
        let inside = a.intersection(&b).unwrap();
        prop_assert!(!outside.overlaps(&inside).unwrap());
        prop_assert_eq!(outside.union(&inside).unwrap(), a);
    }

    #[test]
    fn prop_difference_is_union_minus_intersection(a in arb_moc(), b in arb_moc()) {
        let expected = a
            .union(&b)
            .unwrap()
            .subtraction(&a.intersection(&b).unwrap())
            .unwrap();
        prop_assert_eq!(a.difference(&b).unwrap(), expected);
    }

    #[test]
    fn prop_coverage_is_additive(a in arb_moc(), b in arb_moc()) {
        let union = a.union(&b).unwrap().coverage();
        let intersection = a.intersection(&b).unwrap().coverage();
        assert_abs_diff_eq!(union + intersection, a.coverage() + b.coverage(), epsilon = 1e-12);
    }

    #[test]
    fn prop_complement_is_involutive(m in arb_moc()) {
        let complement = m.complement().unwrap();
        assert_abs_diff_eq!(complement.coverage() + m.coverage(), 1.0, epsilon = 1e-12);
        prop_assert_eq!(complement.complement().unwrap(), m);
    }

    #[test]
    fn prop_incremental_matches_bulk(cells in cells()) {
        let mut incremental = Moc::new();
        for cell in &cells {
            incremental.add_cell(cell.order, cell.npix).unwrap();
        }
        let mut relaxed = Moc::new();
        relaxed.set_check_consistency(false);
        relaxed.add_cells(cells.iter().copied()).unwrap();
        relaxed.check_and_fix();

        let bulk = Moc::from_cells(cells).unwrap();
        prop_assert_eq!(&incremental, &bulk);
        prop_assert_eq!(&relaxed, &bulk);
    }

    #[test]
    fn prop_stored_cells_are_in(m in arb_moc()) {
        for cell in m.iter() {
            prop_assert!(m.is_in(cell.order, cell.npix).unwrap());
            prop_assert!(!m.is_descendant(cell.order, cell.npix).unwrap());
            if let Some(parent) = cell.parent() {
                prop_assert!(m.is_ascendant(parent.order, parent.npix).unwrap());
            }
        }
    }
}
