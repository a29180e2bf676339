//! `/ping` responder used by the supervisor to check that the agent process is alive.

use std::net::{IpAddr, Ipv4Addr};

use rocket::{Build, Rocket, figment::Figment, get, routes};

pub const DEFAULT_LIVENESS_PORT: u16 = 9777;

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

// HEAD requests are answered by rocket's automatic HEAD handling
#[get("/ping")]
fn ping() -> &'static str {
    "pong"
}

// SIGINT/SIGTERM stay with the process, rocket only serves /ping
fn get_config(port: u16) -> Figment {
    rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", DEFAULT_ADDR))
        .merge(("workers", 1))
        .merge(("shutdown.ctrlc", false))
        .merge(("shutdown.signals", Vec::<String>::new()))
}

pub fn rocket(port: u16) -> Rocket<Build> {
    rocket::custom(get_config(port)).mount("/", routes![ping])
}
