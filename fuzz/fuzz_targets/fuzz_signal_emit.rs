#![no_main]

use std::cell::RefCell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use classkit_core::testing::Probe;
use classkit_core::{Class, ClassError};
use classkit_signal::{Callback, Signal};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Connect { who: u8, unary: bool },
    Disconnect { who: u8, index: u8 },
    Emit { who: u8, values: u8 },
    Forget { who: u8 },
}

type Fired = Rc<RefCell<Vec<u32>>>;

// Random connect/disconnect/emit sequences on several instances: emits either
// run every listener once or run none of them.
fuzz_target!(|ops: Vec<Op>| {
    let class = Class::new("Probe");
    let probes: Vec<Probe> = (0..3).map(|v| Probe::new(&class, v)).collect();
    let signal: Signal<Probe, u8> = class.define("changed", Signal::new()).unwrap();

    let fired: Fired = Rc::default();
    let mut connected: Vec<Vec<(u32, bool, Callback<Probe, u8>)>> = vec![Vec::new(); probes.len()];
    let mut next_id = 0_u32;

    for step in ops.into_iter().take(256) {
        match step {
            Op::Connect { who, unary } => {
                let i = usize::from(who) % probes.len();
                let id = next_id;
                next_id += 1;
                let sink = Rc::clone(&fired);
                let callback = if unary {
                    Callback::unary(move |_: &u8| sink.borrow_mut().push(id))
                } else {
                    Callback::nullary(move || sink.borrow_mut().push(id))
                };
                signal.get(&probes[i]).unwrap().connect(callback.clone());
                connected[i].push((id, unary, callback));
            }
            Op::Disconnect { who, index } => {
                let i = usize::from(who) % probes.len();
                let emitter = signal.get(&probes[i]).unwrap();
                if connected[i].is_empty() {
                    assert!(!emitter.disconnect(&Callback::nullary(|| {})));
                } else {
                    let (_, _, target) = connected[i].remove(usize::from(index) % connected[i].len());
                    assert!(emitter.disconnect(&target));
                    assert!(!emitter.is_connected(&target));
                }
            }
            Op::Emit { who, values } => {
                let i = usize::from(who) % probes.len();
                let args: Vec<u8> = (0..values % 3).collect();
                fired.borrow_mut().clear();
                let outcome = signal.get(&probes[i]).unwrap().emit_args(&args);

                let needs_value = connected[i].iter().any(|(_, unary, _)| *unary);
                match args.len() {
                    2 => assert!(matches!(outcome, Err(ClassError::TooManyArguments { given: 2 }))),
                    0 if needs_value => {
                        assert!(matches!(outcome, Err(ClassError::MissingArgument { .. })));
                    }
                    _ => {
                        assert!(outcome.is_ok());
                        let expected: Vec<u32> = connected[i].iter().map(|(id, _, _)| *id).collect();
                        assert_eq!(*fired.borrow(), expected);
                        continue;
                    }
                }
                assert!(fired.borrow().is_empty());
            }
            Op::Forget { who } => {
                let i = usize::from(who) % probes.len();
                signal.delete(&probes[i]).unwrap();
                connected[i].clear();
            }
        }
    }
});
