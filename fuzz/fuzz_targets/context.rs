#![no_main]

use libfuzzer_sys::fuzz_target;
use readpe::{output::Printer, Context};

fuzz_target!(|data: &[u8]| {
    if let Ok(context) = Context::from_mem(data.to_vec()) {
        assert!(context.image().header_len() <= context.image().len());
        let _ = Printer::new(std::io::sink()).all(&context);
    }
});
