// src/trace/ids.rs

//! Random trace / span id generation. All-zero ids are invalid per W3C, so
//! they are redrawn.

pub fn new_trace_id() -> [u8; 16] {
    loop {
        let id: [u8; 16] = rand::random();
        if id != [0u8; 16] {
            return id;
        }
    }
}

pub fn new_span_id() -> [u8; 8] {
    loop {
        let id: [u8; 8] = rand::random();
        if id != [0u8; 8] {
            return id;
        }
    }
}
