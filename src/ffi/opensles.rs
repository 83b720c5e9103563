//! OpenSL ES (Android) declarations
//!
//! OpenSL ES interfaces are pointers to pointers to vtables. Only the slots we
//! call are typed; the others are kept as placeholders so the typed slots sit
//! at the right offsets. Trailing slots we never reach are omitted.

#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::c_void;

pub type SLuint32 = u32;
pub type SLboolean = u32;
pub type SLresult = u32;

pub const SL_BOOLEAN_FALSE: SLboolean = 0;
pub const SL_BOOLEAN_TRUE: SLboolean = 1;

pub const SL_RESULT_SUCCESS: SLresult = 0;

pub const SL_DATALOCATOR_OUTPUTMIX: SLuint32 = 0x0000_0004;
pub const SL_DATALOCATOR_ANDROIDSIMPLEBUFFERQUEUE: SLuint32 = 0x8000_07BD;
pub const SL_DATAFORMAT_PCM: SLuint32 = 0x0000_0002;

pub const SL_PLAYSTATE_STOPPED: SLuint32 = 1;
pub const SL_PLAYSTATE_PAUSED: SLuint32 = 2;
pub const SL_PLAYSTATE_PLAYING: SLuint32 = 3;

pub const SL_SPEAKER_FRONT_LEFT: SLuint32 = 0x0000_0001;
pub const SL_SPEAKER_FRONT_RIGHT: SLuint32 = 0x0000_0002;
pub const SL_SPEAKER_FRONT_CENTER: SLuint32 = 0x0000_0004;

pub const SL_BYTEORDER_LITTLEENDIAN: SLuint32 = 0x0000_0002;

type Slot = *const c_void;

#[repr(C)]
pub struct SLInterfaceID_ {
  pub time_low: SLuint32,
  pub time_mid: u16,
  pub time_hi_and_version: u16,
  pub clock_seq: u16,
  pub node: [u8; 6],
}

pub type SLInterfaceID = *const SLInterfaceID_;

pub type SLObjectItf = *const *const SLObjectItf_;
pub type SLEngineItf = *const *const SLEngineItf_;
pub type SLPlayItf = *const *const SLPlayItf_;
pub type SLAndroidSimpleBufferQueueItf = *const *const SLAndroidSimpleBufferQueueItf_;

pub type slAndroidSimpleBufferQueueCallback =
  unsafe extern "C" fn(caller: SLAndroidSimpleBufferQueueItf, context: *mut c_void);

#[repr(C)]
pub struct SLObjectItf_ {
  pub Realize: unsafe extern "C" fn(this: SLObjectItf, async_: SLboolean) -> SLresult,
  Resume: Slot,
  GetState: Slot,
  pub GetInterface:
    unsafe extern "C" fn(this: SLObjectItf, iid: SLInterfaceID, interface: *mut c_void) -> SLresult,
  RegisterCallback: Slot,
  AbortAsyncOperation: Slot,
  pub Destroy: unsafe extern "C" fn(this: SLObjectItf),
}

#[repr(C)]
pub struct SLEngineItf_ {
  CreateLEDDevice: Slot,
  CreateVibraDevice: Slot,
  pub CreateAudioPlayer: unsafe extern "C" fn(
    this: SLEngineItf,
    player: *mut SLObjectItf,
    audio_src: *const SLDataSource,
    audio_snk: *const SLDataSink,
    num_interfaces: SLuint32,
    interface_ids: *const SLInterfaceID,
    interface_required: *const SLboolean,
  ) -> SLresult,
  CreateAudioRecorder: Slot,
  CreateMidiPlayer: Slot,
  CreateListener: Slot,
  Create3DGroup: Slot,
  pub CreateOutputMix: unsafe extern "C" fn(
    this: SLEngineItf,
    mix: *mut SLObjectItf,
    num_interfaces: SLuint32,
    interface_ids: *const SLInterfaceID,
    interface_required: *const SLboolean,
  ) -> SLresult,
}

#[repr(C)]
pub struct SLPlayItf_ {
  pub SetPlayState: unsafe extern "C" fn(this: SLPlayItf, state: SLuint32) -> SLresult,
  pub GetPlayState: unsafe extern "C" fn(this: SLPlayItf, state: *mut SLuint32) -> SLresult,
}

#[repr(C)]
#[derive(Default)]
pub struct SLAndroidSimpleBufferQueueState {
  pub count: SLuint32,
  pub index: SLuint32,
}

#[repr(C)]
pub struct SLAndroidSimpleBufferQueueItf_ {
  pub Enqueue: unsafe extern "C" fn(
    this: SLAndroidSimpleBufferQueueItf,
    buffer: *const c_void,
    size: SLuint32,
  ) -> SLresult,
  pub Clear: unsafe extern "C" fn(this: SLAndroidSimpleBufferQueueItf) -> SLresult,
  pub GetState: unsafe extern "C" fn(
    this: SLAndroidSimpleBufferQueueItf,
    state: *mut SLAndroidSimpleBufferQueueState,
  ) -> SLresult,
  pub RegisterCallback: unsafe extern "C" fn(
    this: SLAndroidSimpleBufferQueueItf,
    callback: Option<slAndroidSimpleBufferQueueCallback>,
    context: *mut c_void,
  ) -> SLresult,
}

#[repr(C)]
pub struct SLDataLocator_AndroidSimpleBufferQueue {
  pub locatorType: SLuint32,
  pub numBuffers: SLuint32,
}

#[repr(C)]
pub struct SLDataLocator_OutputMix {
  pub locatorType: SLuint32,
  pub outputMix: SLObjectItf,
}

#[repr(C)]
pub struct SLDataFormat_PCM {
  pub formatType: SLuint32,
  pub numChannels: SLuint32,
  /// Sample rate in milliHertz
  pub samplesPerSec: SLuint32,
  pub bitsPerSample: SLuint32,
  pub containerSize: SLuint32,
  pub channelMask: SLuint32,
  pub endianness: SLuint32,
}

#[repr(C)]
pub struct SLDataSource {
  pub pLocator: *mut c_void,
  pub pFormat: *mut c_void,
}

#[repr(C)]
pub struct SLDataSink {
  pub pLocator: *mut c_void,
  pub pFormat: *mut c_void,
}

#[repr(C)]
pub struct SLEngineOption {
  pub feature: SLuint32,
  pub data: SLuint32,
}

unsafe extern "C" {
  pub static SL_IID_ENGINE: SLInterfaceID;
  pub static SL_IID_PLAY: SLInterfaceID;
  pub static SL_IID_ANDROIDSIMPLEBUFFERQUEUE: SLInterfaceID;

  pub fn slCreateEngine(
    engine: *mut SLObjectItf,
    num_options: SLuint32,
    engine_options: *const SLEngineOption,
    num_interfaces: SLuint32,
    interface_ids: *const SLInterfaceID,
    interface_required: *const SLboolean,
  ) -> SLresult;
}
