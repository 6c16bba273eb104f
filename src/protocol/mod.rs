//! Sans-IO protocol layers: RTSP control, SDP, RAOP authentication and
//! encryption, and the audio wire packets
#![allow(missing_docs)]

pub mod raop;
pub mod rtp;
pub mod rtsp;
pub mod sdp;
