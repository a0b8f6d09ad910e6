use local_responder::{respond, Options};

use std::time::Duration;

fn main() {
    env_logger::init();

    let responder = respond(Options::new().text("hello world")).unwrap();

    println!("Listening on {}", responder.url());

    loop {
        std::thread::sleep(Duration::from_secs(1))
    }
}
