// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

use std::process;

mod application;

fn main() {
    match application::run() {
        Ok(_) => process::exit(0),
        Err(_) => process::exit(1),
    }
}
