#![no_main]

use arbitrary::Arbitrary;
use classkit_core::testing::Probe;
use classkit_core::{Class, ClassError, LazySlot};
use classkit_dispatch::VariantMethod;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Register { key: u8, scale: i8 },
    Select { who: u8, key: u8 },
    Call { who: u8, x: i16, y: i16 },
    Item { who: u8, key: u8 },
    Reset { who: u8 },
    Touch { who: u8 },
    Forget { who: u8 },
}

fn scaled(scale: i64) -> impl Fn(&Probe, (i64, i64)) -> i64 {
    move |p, (x, y)| x * scale + y + p.value
}

// Drives a variant table and a plain lazy slot through random operation
// sequences, checking them against a straightforward model.
fuzz_target!(|ops: Vec<Op>| {
    let class = Class::new("Probe");
    let probes: Vec<Probe> = (0..4).map(|v| Probe::new(&class, v)).collect();

    let op = VariantMethod::<u8, Probe, (i64, i64), i64>::new(0, scaled(1));
    let op = class.define("op", op).unwrap();
    let stamp: LazySlot<Probe, i64> = class.define("stamp", LazySlot::new(|p: &Probe| p.value)).unwrap();

    let mut table = [None::<i64>; 256];
    table[0] = Some(1);
    let mut selected = [0_u8; 4];
    let mut stamped = [false; 4];

    for step in ops.into_iter().take(256) {
        match step {
            Op::Register { key, scale } => {
                op.register(key, scaled(i64::from(scale)));
                table[usize::from(key)] = Some(i64::from(scale));
            }
            Op::Select { who, key } => {
                let i = usize::from(who) % probes.len();
                op.get(&probes[i]).unwrap().set(key);
                selected[i] = key;
            }
            Op::Call { who, x, y } => {
                let i = usize::from(who) % probes.len();
                let (x, y) = (i64::from(x), i64::from(y));
                let got = op.get(&probes[i]).unwrap().call((x, y));
                match table[usize::from(selected[i])] {
                    Some(scale) => assert_eq!(got, Ok(x * scale + y + probes[i].value)),
                    None => assert!(matches!(got, Err(ClassError::UnregisteredKey { .. }))),
                }
            }
            Op::Item { who, key } => {
                let i = usize::from(who) % probes.len();
                let dispatcher = op.get(&probes[i]).unwrap();
                let found = dispatcher.item(&key).is_ok();
                assert_eq!(found, table[usize::from(key)].is_some());
                assert_eq!(dispatcher.current_key(), selected[i]);
            }
            Op::Reset { who } => {
                let i = usize::from(who) % probes.len();
                op.delete(&probes[i]).unwrap();
                selected[i] = 0;
            }
            Op::Touch { who } => {
                let i = usize::from(who) % probes.len();
                let first = stamp.get(&probes[i]).unwrap();
                let again = stamp.get(&probes[i]).unwrap();
                assert!(std::rc::Rc::ptr_eq(&first, &again));
                assert_eq!(*first, probes[i].value);
                stamped[i] = true;
            }
            Op::Forget { who } => {
                let i = usize::from(who) % probes.len();
                assert_eq!(stamp.delete(&probes[i]).unwrap(), stamped[i]);
                stamped[i] = false;
            }
        }
    }
});
