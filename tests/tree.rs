mod common;

use pretty_assertions::assert_eq;

use common::*;
use ebml_tree::{
    Checksum, Container, Crc32, Dummy, EbmlElement, ElementImpl, ElementType, Id, Master,
    MissingElement, UintValue,
};

fn names(master: &Master) -> Vec<&'static str> {
    master.children().iter().map(|child| child.name()).collect()
}

fn content(master: &mut Master) -> Vec<u8> {
    let mut out = Vec::new();
    for index in 0..master.len() {
        if let Some(child) = master.get_mut(index) {
            child.render(&mut out, true, false).unwrap();
        }
    }
    out
}

#[test]
fn fresh_containers_satisfy_their_schema() {
    let root = Root::create();
    assert_eq!(vec!["Alpha"], names(&root));
    assert!(root.check_mandatory());

    let group = Master::new(Group::context(), true);
    assert!(group.check_mandatory());
    assert_eq!(
        vec![MissingElement::ValueNotSet {
            element: "Item",
            parent: "Group",
        }],
        group.find_all_missing_elements()
    );
}

#[test]
fn process_mandatory_is_one_level() {
    let mut root = Root::create();
    root.remove_all();
    let mut group = Group::create();
    group.remove_all();
    root.push_element(Box::new(group));
    assert!(!root.check_mandatory());

    root.process_mandatory();
    assert!(root.check_mandatory());
    assert_eq!(vec!["Group", "Alpha"], names(&root));
    let group = root.find_child::<Group>().unwrap();
    assert!(!group.check_mandatory());

    let missing = root.find_all_missing_elements();
    assert_eq!(1, missing.len());
    assert_eq!("missing element \"Item\" in \"Group\"", missing[0].to_string());
}

#[test]
fn sort_is_stable() {
    let mut root = Root::create();
    root.remove_all();
    root.push_element(Box::new(ElementImpl::<Beta>::with_value("first")));
    root.push_element(Box::new(ElementImpl::<Alpha>::new()));
    root.push_element(Box::new(ElementImpl::<Beta>::with_value("second")));
    root.push_element(Box::new(Dummy::new(Id::new_class_a(0x40).unwrap())));
    root.push_element(Box::new(ElementImpl::<Gamma>::new()));

    root.sort();
    assert_eq!(vec!["Alpha", "Beta", "Beta", "Gamma", "Dummy"], names(&root));
    let betas: Vec<String> = root.children_of::<Beta>().map(|b| b.to_value()).collect();
    assert_eq!(vec!["first".to_string(), "second".to_string()], betas);
}

#[test]
fn sort_leaves_insignificant_order_alone() {
    let mut group = Group::create();
    group.add_new_child::<Stamp>().unwrap().set_value(3i8);
    group.sort();
    assert_eq!(vec!["Item", "Stamp"], names(&group));

    group.insert(Box::new(ElementImpl::<Stamp>::new()), 0).unwrap();
    group.sort();
    assert_eq!(vec!["Stamp", "Item", "Stamp"], names(&group));
}

#[test]
fn update_size_is_a_fixpoint() {
    let mut root = Root::create();
    root.add_new_child::<Beta>().unwrap().set_value("text");
    {
        let group = root.add_new_child::<Group>().unwrap();
        group.set_size_is_finite(false);
        group.get_child::<Item>().unwrap().set_value(1u8);
    }

    let first = root.update_size(true).unwrap();
    let second = root.update_size(true).unwrap();
    assert_eq!(first, second);
    // Alpha 3, Beta 6, Group: 2 byte head and a 3 byte Item
    assert_eq!(14, first);
    assert_eq!(first, root.update_size(false).unwrap());

    let mut out = Vec::new();
    root.render(&mut out, false, true).unwrap();
    assert_eq!(root.total_size(), out.len() as u64);
}

#[test]
fn stale_sizes_until_updated() {
    let mut root = Root::create();
    let before = root.update_size(false).unwrap();
    *root.find_child_mut::<Alpha>().unwrap().value_mut() = UintValue::Uint4(9);
    assert_eq!(before, root.update_size(false).unwrap());
    assert_eq!(before + 3, root.update_size(true).unwrap());
}

#[test]
fn insert_then_remove_restores_size() {
    let mut root = Root::create();
    root.add_new_child::<Gamma>().unwrap().set_value(vec![7u8; 3]);
    let before = root.update_size(true).unwrap();

    root.insert(Box::new(ElementImpl::<Beta>::with_value("zz")), 1)
        .unwrap();
    assert_eq!(before + 4, root.update_size(true).unwrap());

    let removed = root.remove(1).unwrap();
    assert_eq!(Beta::ID, removed.id());
    assert_eq!(before, root.update_size(true).unwrap());

    assert!(root.remove(5).is_none());
    assert!(root
        .insert(Box::new(ElementImpl::<Beta>::new()), 9)
        .is_err());
}

#[test]
fn insert_before_and_lookup() {
    let mut root = Root::create();
    root.add_new_child::<Gamma>().unwrap();
    let index = root.insert_before(Box::new(ElementImpl::<Beta>::with_value("b")), Gamma::ID);
    assert_eq!(1, index);
    assert_eq!(Some(1), root.find_first_index(Beta::ID));
    assert_eq!(None, root.find_next_index(1));

    let next = root.find_next_or_create(1).unwrap();
    assert_eq!(3, next);
    assert_eq!(Some(3), root.find_next_index(1));
    assert_eq!(vec!["Alpha", "Beta", "Gamma", "Beta"], names(&root));

    let third = root.get(2).unwrap();
    assert_eq!(Some(2), root.position_of(third));
}

#[test]
fn checksum_follows_content() {
    let mut root = Root::create();
    root.remove_all();
    root.push_element(Box::new(ElementImpl::<Gamma>::with_value(vec![1u8, 2, 3])));
    root.enable_checksum(true);
    assert!(root.has_checksum());

    let stored = root.compute_checksum().unwrap();
    assert_eq!(Crc32.compute(&[0x83, 0x83, 1, 2, 3]), stored);
    assert!(root.verify_checksum().unwrap());
    assert_eq!(11, root.update_size(false).unwrap());

    root.find_child_mut::<Gamma>().unwrap().value_mut().as_mut_vec()[1] = 0x7F;
    assert!(!root.verify_checksum().unwrap());
    assert_eq!(stored, root.crc32());

    let fresh = Crc32.compute(&content(&mut root));
    root.force_checksum(fresh);
    assert!(root.verify_checksum().unwrap());

    root.force_checksum(stored);
    assert!(!root.verify_checksum().unwrap());
    root.compute_checksum().unwrap();
    assert!(root.verify_checksum().unwrap());
    assert_eq!(fresh, root.crc32());

    root.enable_checksum(false);
    assert_eq!(5, root.update_size(false).unwrap());
}

#[test]
fn rendering_a_checksum_stores_it() {
    let mut root = Root::create();
    root.remove_all();
    root.push_element(Box::new(ElementImpl::<Gamma>::with_value(vec![1u8, 2, 3])));
    root.force_checksum(0);

    let mut out = Vec::new();
    root.render(&mut out, false, false).unwrap();
    let crc = Crc32.compute(&[0x83, 0x83, 1, 2, 3]);
    assert_eq!(crc, root.crc32());
    assert_eq!(&crc.to_le_bytes(), &out[7..11]);
}

#[test]
fn clones_are_deep() {
    let mut root = Root::create();
    root.add_new_child::<Group>()
        .unwrap()
        .get_child::<Item>()
        .unwrap()
        .set_value(4u8);
    let copy = root.clone();

    root.find_child_mut::<Group>().unwrap().remove_all();
    let group = copy.find_child::<Group>().unwrap();
    assert_eq!(4, group.find_child::<Item>().unwrap().to_value());

    let fresh = copy.get(1).unwrap().new_instance();
    assert_eq!(Group::ID, fresh.id());
    assert_eq!(1, fresh.as_master().unwrap().len());
}
