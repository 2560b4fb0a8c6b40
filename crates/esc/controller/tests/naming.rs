//! Naming determinism and non-collision

use esc_controller::ResourceNames;
use proptest::prelude::*;

proptest! {
    #[test]
    fn names_are_deterministic(
        template in "[a-z][a-z0-9]{0,12}",
        userland in "[a-z][a-z0-9]{0,12}",
        volume in "[a-z][a-z0-9]{0,8}",
    ) {
        let first = ResourceNames::new(&template, &userland);
        let second = ResourceNames::new(&template, &userland);
        prop_assert_eq!(first.workload(), second.workload());
        prop_assert_eq!(first.service(), second.service());
        prop_assert_eq!(first.claim(&volume), second.claim(&volume));
    }

    #[test]
    fn distinct_bindings_do_not_collide(
        a in ("[a-z][a-z0-9]{0,12}", "[a-z][a-z0-9]{0,12}"),
        b in ("[a-z][a-z0-9]{0,12}", "[a-z][a-z0-9]{0,12}"),
    ) {
        prop_assume!(a != b);
        let left = ResourceNames::new(&a.0, &a.1);
        let right = ResourceNames::new(&b.0, &b.1);
        prop_assert_ne!(left.workload(), right.workload());
        prop_assert_ne!(left.service(), right.service());
        prop_assert_ne!(left.claim("data"), right.claim("data"));
    }
}

#[test]
fn known_names() {
    let names = ResourceNames::new("t1", "u1");
    assert_eq!(names.workload(), "t1-u1");
    assert_eq!(names.claim("data"), "t1-u1-pvc-data");
}
