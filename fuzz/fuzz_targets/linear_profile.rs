#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = lightsweep::sweep::arbtests::linear_profile(&mut Unstructured::new(data));
});
