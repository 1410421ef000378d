use std::sync::{Arc, Mutex};

use garage_hardware::{HwError, SimulatedGpio};
use garage_traits::{EdgeWatch, Gpio};
use rstest::rstest;

#[rstest]
fn input_follows_driven_level() {
    let mut gpio = SimulatedGpio::new();
    gpio.set_input(27, true);
    gpio.setup_input(27).unwrap();
    assert!(gpio.read(27).unwrap());

    gpio.set_input(27, false);
    assert!(!gpio.read(27).unwrap());
}

#[rstest]
fn watchers_only_see_changes_on_their_pin() {
    let mut gpio = SimulatedGpio::new();
    gpio.setup_input(27).unwrap();
    gpio.setup_input(22).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    gpio.watch_input(27, Box::new(move |pin, high| sink.lock().unwrap().push((pin, high))))
        .unwrap();

    gpio.set_input(27, true);
    gpio.set_input(27, true); // no edge
    gpio.set_input(22, true);
    gpio.set_input(27, false);

    assert_eq!(*seen.lock().unwrap(), vec![(27, true), (27, false)]);
}

#[rstest]
fn injected_fault_leaves_level_untouched() {
    let mut gpio = SimulatedGpio::new();
    gpio.setup_output(17, false).unwrap();
    gpio.fail_writes(true);

    let err = gpio.write(17, true).expect_err("fault injected");
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::InjectedFault(17))
    ));
    assert_eq!(gpio.output_level(17), Some(false));
    assert!(gpio.writes().is_empty());
}

#[rstest]
#[case::output_then_input(true)]
#[case::input_then_output(false)]
fn direction_conflicts_are_errors(#[case] output_first: bool) {
    let mut gpio = SimulatedGpio::new();
    if output_first {
        gpio.setup_output(5, false).unwrap();
        assert!(gpio.setup_input(5).is_err());
    } else {
        gpio.setup_input(5).unwrap();
        assert!(gpio.setup_output(5, false).is_err());
        assert!(gpio.write(5, true).is_err());
    }
}
