// FluxSand - Worker Threads
//
// One function per thread.  Each loop checks the shared `Shutdown` flag at
// the top and never lets an error escape: faults are logged and the loop
// carries on.

pub mod ahrs;
pub mod buttons;
pub mod buzzer;
pub mod env;
pub mod gesture;
pub mod sand;
pub mod sensor;
pub mod ui;
