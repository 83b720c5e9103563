//! OpenSL ES PCM output for Android
//!
//! One engine, one output mix and one audio player fed through an Android
//! simple buffer queue. The track owns `N` PCM slots: `enqueue` copies into a
//! free slot and hands it to OpenSL, the buffer-queue callback recycles the
//! oldest in-flight slot and notifies the registered listener.

use crate::ffi::opensles::{
  SL_BOOLEAN_FALSE, SL_BOOLEAN_TRUE, SL_BYTEORDER_LITTLEENDIAN, SL_DATAFORMAT_PCM,
  SL_DATALOCATOR_ANDROIDSIMPLEBUFFERQUEUE, SL_DATALOCATOR_OUTPUTMIX,
  SL_IID_ANDROIDSIMPLEBUFFERQUEUE, SL_IID_ENGINE, SL_IID_PLAY, SL_PLAYSTATE_PAUSED,
  SL_PLAYSTATE_PLAYING, SL_PLAYSTATE_STOPPED, SL_RESULT_SUCCESS, SL_SPEAKER_FRONT_CENTER,
  SL_SPEAKER_FRONT_LEFT, SL_SPEAKER_FRONT_RIGHT,
  SLAndroidSimpleBufferQueueItf, SLAndroidSimpleBufferQueueState, SLDataFormat_PCM,
  SLDataLocator_AndroidSimpleBufferQueue, SLDataLocator_OutputMix, SLDataSink, SLDataSource,
  SLEngineItf, SLInterfaceID, SLObjectItf, SLPlayItf, SLresult, SLuint32, slCreateEngine,
};
use crate::player::{AudioBuffer, AudioOutputConfig, HandleTable};
use crossbeam::queue::ArrayQueue;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;

/// OpenSL ES error type
#[derive(Debug, thiserror::Error)]
pub enum SlError {
  #[error("{call} failed with SLresult {code}")]
  Call { call: &'static str, code: SLresult },

  #[error("Audio track is not prepared")]
  NotPrepared,

  #[error("All {0} buffer slots are queued")]
  QueueFull(usize),

  #[error("Invalid audio track configuration: {0}")]
  InvalidConfig(String),
}

fn check(call: &'static str, code: SLresult) -> Result<(), SlError> {
  if code == SL_RESULT_SUCCESS {
    Ok(())
  } else {
    Err(SlError::Call { call, code })
  }
}

/// Called on the OpenSL ES thread each time a queued buffer finished playing
pub trait BufferQueueListener: Send + Sync {
  fn on_buffer_consumed(&self);
}

/// State shared with the buffer-queue callback
struct CallbackContext {
  free: ArrayQueue<usize>,
  in_flight: ArrayQueue<usize>,
  listener: Option<Box<dyn BufferQueueListener>>,
}

impl CallbackContext {
  fn new(slots: usize, listener: Option<Box<dyn BufferQueueListener>>) -> Self {
    let free = ArrayQueue::new(slots);
    for slot in 0..slots {
      let _ = free.push(slot);
    }
    Self {
      free,
      in_flight: ArrayQueue::new(slots),
      listener,
    }
  }

  /// Move the oldest in-flight slot back to the free list
  fn recycle_one(&self) {
    if let Some(slot) = self.in_flight.pop() {
      let _ = self.free.push(slot);
    }
  }

  fn recycle_all(&self) {
    while let Some(slot) = self.in_flight.pop() {
      let _ = self.free.push(slot);
    }
  }
}

/// Callback contexts by id; OpenSL only ever sees the id
static CALLBACKS: HandleTable<CallbackContext> = HandleTable::new();

unsafe extern "C" fn buffer_queue_callback(
  _caller: SLAndroidSimpleBufferQueueItf,
  context: *mut c_void,
) {
  let Some(ctx) = CALLBACKS.get(context as i64) else {
    return;
  };
  ctx.recycle_one();
  if let Some(listener) = &ctx.listener {
    listener.on_buffer_consumed();
  }
}

/// Unregister a context OpenSL never saw and hand back its listener
fn unregister_unused(
  callback_id: i64,
  callback: Arc<CallbackContext>,
) -> Option<Box<dyn BufferQueueListener>> {
  CALLBACKS.remove(callback_id);
  Arc::try_unwrap(callback).ok().and_then(|ctx| ctx.listener)
}

/// SL_SPEAKER_* mask for a channel count
pub fn channel_mask(channels: u32) -> Option<SLuint32> {
  match channels {
    1 => Some(SL_SPEAKER_FRONT_CENTER),
    2 => Some(SL_SPEAKER_FRONT_LEFT | SL_SPEAKER_FRONT_RIGHT),
    _ => None,
  }
}

/// Realized OpenSL objects, destroyed in reverse creation order
struct SlObjects {
  engine_object: SLObjectItf,
  output_mix: SLObjectItf,
  player_object: SLObjectItf,
  play: SLPlayItf,
  queue: SLAndroidSimpleBufferQueueItf,
}

unsafe fn destroy_object(object: SLObjectItf) {
  if !object.is_null() {
    unsafe { ((**object).Destroy)(object) };
  }
}

impl Drop for SlObjects {
  fn drop(&mut self) {
    unsafe {
      destroy_object(self.player_object);
      destroy_object(self.output_mix);
      destroy_object(self.engine_object);
    }
  }
}

/// PCM output through an OpenSL ES buffer queue
pub struct OpenSlAudioTrack {
  objects: Option<SlObjects>,
  callback_id: i64,
  callback: Option<Arc<CallbackContext>>,
  slots: Vec<Vec<u8>>,
  listener: Option<Box<dyn BufferQueueListener>>,
}

impl OpenSlAudioTrack {
  /// `listener` is told about every consumed buffer once the track is prepared
  pub fn new(listener: Option<Box<dyn BufferQueueListener>>) -> Self {
    Self {
      objects: None,
      callback_id: 0,
      callback: None,
      slots: Vec::new(),
      listener,
    }
  }

  /// Create the engine, output mix and player for `config` with
  /// `queue_size` buffer slots
  pub fn prepare(&mut self, config: &AudioOutputConfig, queue_size: u32) -> Result<(), SlError> {
    if self.objects.is_some() {
      return Err(SlError::InvalidConfig("Audio track already prepared".into()));
    }
    if queue_size == 0 {
      return Err(SlError::InvalidConfig("Buffer queue needs at least one slot".into()));
    }
    let mask = channel_mask(config.channels)
      .ok_or_else(|| SlError::InvalidConfig(format!("{} channels", config.channels)))?;
    if !matches!(config.bit_depth, 8 | 16 | 32) {
      return Err(SlError::InvalidConfig(format!("{} bit samples", config.bit_depth)));
    }

    let mut objects = SlObjects {
      engine_object: ptr::null(),
      output_mix: ptr::null(),
      player_object: ptr::null(),
      play: ptr::null(),
      queue: ptr::null(),
    };

    unsafe {
      check(
        "slCreateEngine",
        slCreateEngine(&mut objects.engine_object, 0, ptr::null(), 0, ptr::null(), ptr::null()),
      )?;
      let engine_object = objects.engine_object;
      check("Engine Realize", ((**engine_object).Realize)(engine_object, SL_BOOLEAN_FALSE))?;
      let mut engine: SLEngineItf = ptr::null();
      check(
        "Engine GetInterface",
        ((**engine_object).GetInterface)(
          engine_object,
          SL_IID_ENGINE,
          &mut engine as *mut SLEngineItf as *mut c_void,
        ),
      )?;

      check(
        "CreateOutputMix",
        ((**engine).CreateOutputMix)(engine, &mut objects.output_mix, 0, ptr::null(), ptr::null()),
      )?;
      let output_mix = objects.output_mix;
      check("OutputMix Realize", ((**output_mix).Realize)(output_mix, SL_BOOLEAN_FALSE))?;

      let mut locator = SLDataLocator_AndroidSimpleBufferQueue {
        locatorType: SL_DATALOCATOR_ANDROIDSIMPLEBUFFERQUEUE,
        numBuffers: queue_size,
      };
      let mut format = SLDataFormat_PCM {
        formatType: SL_DATAFORMAT_PCM,
        numChannels: config.channels,
        samplesPerSec: config.sample_rate * 1000,
        bitsPerSample: config.bit_depth,
        containerSize: config.bit_depth,
        channelMask: mask,
        endianness: SL_BYTEORDER_LITTLEENDIAN,
      };
      let source = SLDataSource {
        pLocator: &mut locator as *mut _ as *mut c_void,
        pFormat: &mut format as *mut _ as *mut c_void,
      };
      let mut mix_locator = SLDataLocator_OutputMix {
        locatorType: SL_DATALOCATOR_OUTPUTMIX,
        outputMix: output_mix,
      };
      let sink = SLDataSink {
        pLocator: &mut mix_locator as *mut _ as *mut c_void,
        pFormat: ptr::null_mut(),
      };

      let ids: [SLInterfaceID; 1] = [SL_IID_ANDROIDSIMPLEBUFFERQUEUE];
      let required = [SL_BOOLEAN_TRUE];
      check(
        "CreateAudioPlayer",
        ((**engine).CreateAudioPlayer)(
          engine,
          &mut objects.player_object,
          &source,
          &sink,
          ids.len() as SLuint32,
          ids.as_ptr(),
          required.as_ptr(),
        ),
      )?;
      let player_object = objects.player_object;
      check("Player Realize", ((**player_object).Realize)(player_object, SL_BOOLEAN_FALSE))?;
      check(
        "Player GetInterface(PLAY)",
        ((**player_object).GetInterface)(
          player_object,
          SL_IID_PLAY,
          &mut objects.play as *mut SLPlayItf as *mut c_void,
        ),
      )?;
      check(
        "Player GetInterface(BUFFERQUEUE)",
        ((**player_object).GetInterface)(
          player_object,
          SL_IID_ANDROIDSIMPLEBUFFERQUEUE,
          &mut objects.queue as *mut SLAndroidSimpleBufferQueueItf as *mut c_void,
        ),
      )?;
    }

    let slots = queue_size as usize;
    let callback = Arc::new(CallbackContext::new(slots, self.listener.take()));
    let callback_id = CALLBACKS.add(Arc::clone(&callback));
    let queue = objects.queue;
    let registered = unsafe {
      ((**queue).RegisterCallback)(queue, Some(buffer_queue_callback), callback_id as *mut c_void)
    };
    if let Err(e) = check("RegisterCallback", registered) {
      self.listener = unregister_unused(callback_id, callback);
      return Err(e);
    }

    tracing::debug!(
      target: "tmedia",
      "OpenSL ES track prepared: {} ch @ {} Hz, {} bit, {} slots",
      config.channels,
      config.sample_rate,
      config.bit_depth,
      slots
    );
    self.slots = vec![Vec::new(); slots];
    self.callback_id = callback_id;
    self.callback = Some(callback);
    self.objects = Some(objects);
    Ok(())
  }

  fn objects(&self) -> Result<&SlObjects, SlError> {
    self.objects.as_ref().ok_or(SlError::NotPrepared)
  }

  fn set_play_state(&self, state: SLuint32) -> Result<(), SlError> {
    let play = self.objects()?.play;
    check("SetPlayState", unsafe { ((**play).SetPlayState)(play, state) })
  }

  pub fn play(&self) -> Result<(), SlError> {
    self.set_play_state(SL_PLAYSTATE_PLAYING)
  }

  pub fn pause(&self) -> Result<(), SlError> {
    self.set_play_state(SL_PLAYSTATE_PAUSED)
  }

  /// Stop playback; OpenSL drops every queued buffer
  pub fn stop(&self) -> Result<(), SlError> {
    self.set_play_state(SL_PLAYSTATE_STOPPED)?;
    if let Some(callback) = &self.callback {
      callback.recycle_all();
    }
    Ok(())
  }

  /// Copy `pcm` into a free slot and queue it for playback
  pub fn enqueue(&mut self, pcm: &[u8]) -> Result<(), SlError> {
    let queue = self.objects()?.queue;
    let callback = self.callback.as_ref().ok_or(SlError::NotPrepared)?;
    let slot = callback.free.pop().ok_or(SlError::QueueFull(self.slots.len()))?;

    let buffer = &mut self.slots[slot];
    buffer.clear();
    buffer.extend_from_slice(pcm);
    // The callback for this buffer may run before Enqueue returns
    if callback.in_flight.push(slot).is_err() {
      let _ = callback.free.push(slot);
      return Err(SlError::QueueFull(self.slots.len()));
    }

    let result = unsafe {
      ((**queue).Enqueue)(queue, buffer.as_ptr() as *const c_void, buffer.len() as SLuint32)
    };
    if let Err(e) = check("Enqueue", result) {
      tracing::warn!(target: "tmedia", "Enqueue failed, clearing the queue: {}", e);
      self.clear_buffers()?;
      return Err(e);
    }
    Ok(())
  }

  /// Queue the PCM of a decoded audio buffer
  pub fn enqueue_buffer(&mut self, buffer: &AudioBuffer) -> Result<(), SlError> {
    self.enqueue(buffer.pcm.content())
  }

  /// Drop every queued buffer
  pub fn clear_buffers(&self) -> Result<(), SlError> {
    let queue = self.objects()?.queue;
    check("Clear", unsafe { ((**queue).Clear)(queue) })?;
    if let Some(callback) = &self.callback {
      callback.recycle_all();
    }
    Ok(())
  }

  /// Buffers queued in OpenSL and not yet played
  pub fn buffer_queue_count(&self) -> Result<u32, SlError> {
    let queue = self.objects()?.queue;
    let mut state = SLAndroidSimpleBufferQueueState::default();
    check("GetState", unsafe { ((**queue).GetState)(queue, &mut state) })?;
    Ok(state.count)
  }

  /// Destroy the OpenSL objects; late callbacks find nothing to call
  pub fn release(&mut self) {
    if let Some(objects) = self.objects.take() {
      drop(objects);
      CALLBACKS.remove(self.callback_id);
      self.callback = None;
      tracing::debug!(target: "tmedia", "OpenSL ES track released");
    }
  }
}

impl Drop for OpenSlAudioTrack {
  fn drop(&mut self) {
    self.release();
  }
}

// OpenSL interfaces are thread-safe; the slots are only touched through &mut self
unsafe impl Send for OpenSlAudioTrack {}

impl std::fmt::Debug for OpenSlAudioTrack {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OpenSlAudioTrack")
      .field("prepared", &self.objects.is_some())
      .field("slots", &self.slots.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Counter(Arc<AtomicUsize>);

  impl BufferQueueListener for Counter {
    fn on_buffer_consumed(&self) {
      self.0.fetch_add(1, Ordering::SeqCst);
    }
  }

  #[test]
  fn test_channel_mask() {
    assert_eq!(channel_mask(1), Some(SL_SPEAKER_FRONT_CENTER));
    assert_eq!(channel_mask(2), Some(SL_SPEAKER_FRONT_LEFT | SL_SPEAKER_FRONT_RIGHT));
    assert_eq!(channel_mask(6), None);
  }

  #[test]
  fn test_callback_recycles_oldest_slot() {
    let count = Arc::new(AtomicUsize::new(0));
    let ctx = Arc::new(CallbackContext::new(3, Some(Box::new(Counter(Arc::clone(&count))))));
    // Slots 0 and 1 handed to OpenSL, booked the way enqueue does
    for _ in 0..2 {
      let slot = ctx.free.pop().unwrap();
      ctx.in_flight.push(slot).unwrap();
    }
    let id = CALLBACKS.add(Arc::clone(&ctx));

    unsafe { buffer_queue_callback(ptr::null(), id as *mut c_void) };
    assert_eq!(ctx.in_flight.len(), 1);
    assert_eq!(ctx.free.len(), 2);

    unsafe { buffer_queue_callback(ptr::null(), id as *mut c_void) };
    unsafe { buffer_queue_callback(ptr::null(), id as *mut c_void) };
    assert_eq!(ctx.in_flight.len(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 3);

    CALLBACKS.remove(id);
    let order: Vec<usize> = std::iter::from_fn(|| ctx.free.pop()).collect();
    assert_eq!(order, vec![2, 0, 1]);
  }

  #[test]
  fn test_failed_registration_keeps_listener() {
    let count = Arc::new(AtomicUsize::new(0));
    let callback = Arc::new(CallbackContext::new(2, Some(Box::new(Counter(Arc::clone(&count))))));
    let id = CALLBACKS.add(Arc::clone(&callback));

    let listener = unregister_unused(id, callback);
    assert!(CALLBACKS.get(id).is_none());
    let listener = listener.unwrap();
    listener.on_buffer_consumed();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_callback_for_released_track_is_ignored() {
    let count = Arc::new(AtomicUsize::new(0));
    let ctx = Arc::new(CallbackContext::new(2, Some(Box::new(Counter(Arc::clone(&count))))));
    let id = CALLBACKS.add(ctx);

    unsafe { buffer_queue_callback(ptr::null(), id as *mut c_void) };
    assert_eq!(count.load(Ordering::SeqCst), 1);

    CALLBACKS.remove(id);
    unsafe { buffer_queue_callback(ptr::null(), id as *mut c_void) };
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_unprepared_track() {
    let mut track = OpenSlAudioTrack::new(None);
    assert!(matches!(track.play(), Err(SlError::NotPrepared)));
    assert!(matches!(track.enqueue(&[0; 4]), Err(SlError::NotPrepared)));
    assert!(matches!(track.buffer_queue_count(), Err(SlError::NotPrepared)));
    track.release();
  }

  #[test]
  fn test_prepare_rejects_bad_config() {
    let mut track = OpenSlAudioTrack::new(None);
    let config = AudioOutputConfig {
      channels: 3,
      ..AudioOutputConfig::default()
    };
    assert!(matches!(track.prepare(&config, 4), Err(SlError::InvalidConfig(_))));
    assert!(matches!(
      track.prepare(&AudioOutputConfig::default(), 0),
      Err(SlError::InvalidConfig(_))
    ));
  }
}
