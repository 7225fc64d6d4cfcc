//! GStreamer-backed media element.
//!
//! One `playbin` per presentation, with an RGBA `appsink` as the video sink.
//! Decoded frames cross from the streaming thread to the UI thread through a
//! bounded latest-frame channel; everything else is polled from the pipeline
//! bus and properties once per UI frame.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use gstreamer_video::VideoFrameExt;
use tracing::{debug, warn};

use crate::media::{MediaElement, MediaError, MediaEvent, VideoFrame};

/// State mirrored from the pipeline so `poll` can emit change events only
/// when something actually moved.
#[derive(Debug, Clone, Copy, Default)]
struct Mirror {
    position: f64,
    duration: f64,
    playing: bool,
    volume: f64,
    muted: bool,
}

pub struct GstMediaElement {
    playbin: gst::Element,
    frames: Receiver<VideoFrame>,
    mirror: Mirror,
    faulted: bool,
}

impl GstMediaElement {
    /// Build a paused pipeline on `uri`. Call `gst::init` once before the
    /// first element is created.
    pub fn new(uri: &str) -> Result<Self, MediaError> {
        let playbin = gst::ElementFactory::make("playbin")
            .property("uri", uri)
            .build()
            .map_err(|e| MediaError::Fault(format!("failed to create playbin: {e}")))?;

        let appsink = gst_app::AppSink::builder()
            .caps(
                &gst_video::VideoCapsBuilder::new()
                    .format(gst_video::VideoFormat::Rgba)
                    .build(),
            )
            .max_buffers(1)
            .drop(true)
            .sync(true)
            .build();

        let (tx, rx) = crossbeam_channel::bounded::<VideoFrame>(1);
        // The channel is MPMC, so the streaming thread keeps a receiver of
        // its own to evict the stale frame when the UI falls behind.
        let drain = rx.clone();
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    if let Some(frame) = frame_from_sample(&sample) {
                        push_latest(&tx, &drain, frame);
                    }
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );
        playbin.set_property("video-sink", &appsink);

        playbin
            .set_state(gst::State::Paused)
            .map_err(|e| MediaError::Fault(format!("failed to preroll: {e}")))?;

        Ok(Self {
            playbin,
            frames: rx,
            mirror: Mirror {
                volume: 1.0,
                ..Mirror::default()
            },
            faulted: false,
        })
    }

    fn drain_bus(&mut self, events: &mut Vec<MediaEvent>) {
        let Some(bus) = self.playbin.bus() else {
            return;
        };
        while let Some(message) = bus.pop() {
            match message.view() {
                gst::MessageView::Eos(_) => {
                    debug!("end of stream");
                    let _ = self.playbin.set_state(gst::State::Paused);
                    events.push(MediaEvent::EndOfStream);
                }
                gst::MessageView::Error(err) => {
                    let text = format!("{} ({:?})", err.error(), err.debug());
                    warn!("pipeline error: {text}");
                    self.faulted = true;
                    let _ = self.playbin.set_state(gst::State::Null);
                    events.push(MediaEvent::Fault(text));
                }
                _ => {}
            }
        }
    }

    fn mirror_properties(&mut self, events: &mut Vec<MediaEvent>) {
        if let Some(position) = self.playbin.query_position::<gst::ClockTime>() {
            let seconds = position.seconds_f64();
            if (seconds - self.mirror.position).abs() > f64::EPSILON {
                self.mirror.position = seconds;
                events.push(MediaEvent::PositionChanged(seconds));
            }
        }
        if let Some(duration) = self.playbin.query_duration::<gst::ClockTime>() {
            let seconds = duration.seconds_f64();
            if (seconds - self.mirror.duration).abs() > f64::EPSILON {
                self.mirror.duration = seconds;
                events.push(MediaEvent::DurationChanged(seconds));
            }
        }

        let (_, state, _) = self.playbin.state(gst::ClockTime::ZERO);
        let playing = state == gst::State::Playing;
        if playing != self.mirror.playing {
            self.mirror.playing = playing;
            events.push(MediaEvent::PlayingChanged(playing));
        }

        let volume = self.playbin.property::<f64>("volume");
        if (volume - self.mirror.volume).abs() > f64::EPSILON {
            self.mirror.volume = volume;
            events.push(MediaEvent::VolumeChanged(volume));
        }
        let muted = self.playbin.property::<bool>("mute");
        if muted != self.mirror.muted {
            self.mirror.muted = muted;
            events.push(MediaEvent::MutedChanged(muted));
        }
    }
}

impl MediaElement for GstMediaElement {
    fn play(&mut self) -> Result<(), MediaError> {
        if self.faulted {
            return Ok(());
        }
        self.playbin
            .set_state(gst::State::Playing)
            .map(|_| ())
            .map_err(|_| MediaError::PlayRejected)
    }

    fn pause(&mut self) {
        if self.faulted {
            return;
        }
        if let Err(e) = self.playbin.set_state(gst::State::Paused) {
            warn!("pause failed: {e}");
        }
    }

    fn seek(&mut self, seconds: f64) {
        if self.faulted {
            return;
        }
        let target = gst::ClockTime::from_seconds_f64(seconds.max(0.0));
        if let Err(e) = self.playbin.seek_simple(
            gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
            target,
        ) {
            warn!("seek to {seconds:.1}s failed: {e}");
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.playbin.set_property("volume", volume.clamp(0.0, 1.0));
    }

    fn set_muted(&mut self, muted: bool) {
        self.playbin.set_property("mute", muted);
    }

    fn poll(&mut self) -> Vec<MediaEvent> {
        let mut events = Vec::new();
        self.drain_bus(&mut events);
        if !self.faulted {
            self.mirror_properties(&mut events);
        }
        events
    }

    fn take_frame(&mut self) -> Option<VideoFrame> {
        // Keep only the newest frame if the sink outpaced the UI.
        let mut latest = None;
        while let Ok(frame) = self.frames.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}

impl Drop for GstMediaElement {
    fn drop(&mut self) {
        let _ = self.playbin.set_state(gst::State::Null);
    }
}

/// Copy a prerolled RGBA sample out of the pipeline.
fn frame_from_sample(sample: &gst::Sample) -> Option<VideoFrame> {
    let caps = sample.caps()?;
    let info = gst_video::VideoInfo::from_caps(caps).ok()?;
    let buffer = sample.buffer()?;
    let frame = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info).ok()?;

    let width = info.width();
    let height = info.height();
    let stride = frame.plane_stride()[0] as usize;
    let data = frame.plane_data(0).ok()?;
    let row_bytes = width as usize * 4;

    // Strides can exceed width*4; copy row by row into a tight buffer.
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }

    Some(VideoFrame {
        width,
        height,
        pixels,
    })
}

/// Latest-wins send: a full channel drops the stale frame, never blocks the
/// streaming thread.
fn push_latest(tx: &Sender<VideoFrame>, drain: &Receiver<VideoFrame>, frame: VideoFrame) {
    match tx.try_send(frame) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(frame)) => {
            let _ = drain.try_recv();
            let _ = tx.try_send(frame);
        }
    }
}
