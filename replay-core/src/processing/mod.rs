pub mod pcm;
pub mod ring_buffer;
pub mod trimmer;
pub mod wav;
