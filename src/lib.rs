//! An HTTP endpoint that synthesizes a response of a requested (or random)
//! size and trickles it out in fixed-size chunks over a requested (or
//! random) duration. Useful for exercising clients, proxies and load
//! balancers against slow, large or uneven upstreams.

pub mod cli;
pub mod http;
pub mod logging;
pub mod params;
pub mod random;
pub mod shutdown;
pub mod stream;
