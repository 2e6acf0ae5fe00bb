//! Loopback emulator of a latency-loop device.
//!
//! Listens on an ephemeral port and answers the line protocol the way the
//! hardware does: `C` with `0`, `L 0 <port>` with `1`, empty lines with
//! nothing, anything else with `-1`. A silent emulator reads commands but
//! never answers.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cytec::DeviceEndpoint;

pub struct DeviceEmulator {
    port: u16,
    commands: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl DeviceEmulator {
    pub fn start() -> Self {
        Self::spawn(true)
    }

    pub fn silent() -> Self {
        Self::spawn(false)
    }

    fn spawn(answer: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind emulator");
        let port = listener.local_addr().expect("local addr").port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));

        {
            let commands = commands.clone();
            let accepted = accepted.clone();
            let closed = closed.clone();
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let commands = commands.clone();
                    let closed = closed.clone();
                    thread::spawn(move || {
                        serve(stream, answer, &commands);
                        closed.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }

        Self {
            port,
            commands,
            accepted,
            closed,
        }
    }

    pub fn endpoint(&self) -> DeviceEndpoint {
        DeviceEndpoint::new("127.0.0.1", self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("commands lock").clone()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until `count` client connections have been closed.
    pub fn wait_closed(&self, count: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.closed() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

fn serve(stream: TcpStream, answer: bool, commands: &Mutex<Vec<String>>) {
    let mut writer = stream.try_clone().expect("clone stream");
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let command = line.trim_end_matches(['\r', '\n']).to_string();
        if command.is_empty() {
            continue;
        }
        commands.lock().expect("commands lock").push(command.clone());
        if !answer {
            continue;
        }
        let reply = if command == "C" {
            "0"
        } else if command.starts_with("L 0 ") {
            "1"
        } else {
            "-1"
        };
        if writer.write_all(format!("{reply}\r\n").as_bytes()).is_err() {
            return;
        }
    }
}
