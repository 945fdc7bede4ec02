#![no_main]

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = lightsweep::sweep::arbtests::radial_fan(&mut Unstructured::new(data));
});
