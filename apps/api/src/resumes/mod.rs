// Resume intake: turns uploaded PDF / plain-text files into candidate text.

pub mod extract;
pub mod handlers;
