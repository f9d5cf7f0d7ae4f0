//! Android fingerprint backend using JNI.
//!
//! A bundled Kotlin helper (`FingerprintHelper.kt`, compiled to DEX at build
//! time) wraps `FingerprintManagerCompat`. The DEX is written to the app
//! cache directory and loaded through a `DexClassLoader`; its native
//! `onEvent` method is registered manually and forwards every callback into
//! the session channel, keyed by a scan token.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, JavaVM};
use log::{error, warn};
use tokio::sync::Notify;

use crate::{CancellationSignal, EventSink, FingerprintBackend, FingerprintError, ScanEvent};

/// Embedded DEX bytecode containing the FingerprintHelper class.
/// Generated at build time by kotlinc + D8.
static DEX_BYTES: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/classes.dex"));

/// Cached class loader for the embedded DEX.
static CLASS_LOADER: OnceLock<GlobalRef> = OnceLock::new();

/// In-flight scans keyed by the token handed to Java.
static SCANS: OnceLock<Mutex<HashMap<u64, ScanEntry>>> = OnceLock::new();

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

const HELPER_CLASS: &str = "fingerkit.fingerprint.FingerprintHelper";

// Event kinds shared with FingerprintHelper.kt.
const KIND_SUCCEEDED: jint = 0;
const KIND_FAILED: jint = 1;
const KIND_ERROR: jint = 2;
const KIND_HELP: jint = 3;

struct ScanEntry {
    sink: EventSink,
    done: Arc<Notify>,
}

fn scans() -> &'static Mutex<HashMap<u64, ScanEntry>> {
    SCANS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn jni_error(op: &str, err: impl fmt::Display) -> FingerprintError {
    FingerprintError::Platform(format!("{op}: {err}"))
}

/// Initialize the DEX class loader. Must be called with a valid Context.
fn init_with_context(env: &mut JNIEnv, context: &JObject) -> Result<(), FingerprintError> {
    if CLASS_LOADER.get().is_some() {
        return Ok(());
    }

    // Write DEX to the cache directory
    let cache_dir = env
        .call_method(context, "getCacheDir", "()Ljava/io/File;", &[])
        .map_err(|e| jni_error("getCacheDir", e))?
        .l()
        .map_err(|e| jni_error("getCacheDir result", e))?;

    let cache_path = env
        .call_method(&cache_dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
        .map_err(|e| jni_error("getAbsolutePath", e))?
        .l()
        .map_err(|e| jni_error("getAbsolutePath result", e))?;

    let dex_path = format!(
        "{}/fingerkit_fingerprint.dex",
        env.get_string((&cache_path).into())
            .map_err(|e| jni_error("get_string", e))?
            .to_str()
            .map_err(|e| jni_error("to_str", e))?
    );

    std::fs::write(&dex_path, DEX_BYTES).map_err(|e| jni_error("write DEX", e))?;

    let dex_path_jstring = env
        .new_string(&dex_path)
        .map_err(|e| jni_error("new_string", e))?;

    let parent_loader = env
        .call_method(context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .map_err(|e| jni_error("getClassLoader", e))?
        .l()
        .map_err(|e| jni_error("getClassLoader result", e))?;

    let dex_class_loader_class = env
        .find_class("dalvik/system/DexClassLoader")
        .map_err(|e| jni_error("find DexClassLoader", e))?;

    let class_loader = env
        .new_object(
            dex_class_loader_class,
            "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/ClassLoader;)V",
            &[
                JValue::Object(&dex_path_jstring),
                JValue::Object(&cache_path),
                JValue::Object(&JObject::null()),
                JValue::Object(&parent_loader),
            ],
        )
        .map_err(|e| jni_error("new DexClassLoader", e))?;

    let global_ref = env
        .new_global_ref(class_loader)
        .map_err(|e| jni_error("new_global_ref", e))?;

    let _ = CLASS_LOADER.set(global_ref);

    // The helper class lives in a secondary DEX, so its native method must
    // be registered on the dynamically loaded class by hand.
    register_natives(env)
}

fn register_natives(env: &mut JNIEnv) -> Result<(), FingerprintError> {
    let class = helper_class(env)?;
    let native_methods = [jni::NativeMethod {
        name: "onEvent".into(),
        sig: "(JIILjava/lang/String;)V".into(),
        fn_ptr: Java_fingerkit_fingerprint_FingerprintHelper_onEvent as *mut _,
    }];

    env.register_native_methods(&class, &native_methods)
        .map_err(|e| jni_error("register_native_methods", e))
}

fn helper_class<'local>(env: &mut JNIEnv<'local>) -> Result<JClass<'local>, FingerprintError> {
    let class_loader = CLASS_LOADER
        .get()
        .ok_or_else(|| FingerprintError::Platform("class loader not initialized".into()))?;

    let helper_class_name = env
        .new_string(HELPER_CLASS)
        .map_err(|e| jni_error("new_string", e))?;

    let helper_class = env
        .call_method(
            class_loader.as_obj(),
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&helper_class_name)],
        )
        .map_err(|e| jni_error("loadClass", e))?
        .l()
        .map_err(|e| jni_error("loadClass result", e))?;

    Ok(helper_class.into())
}

#[unsafe(no_mangle)]
extern "system" fn Java_fingerkit_fingerprint_FingerprintHelper_onEvent(
    mut env: JNIEnv,
    _class: JClass,
    token: jlong,
    kind: jint,
    code: jint,
    message: JString,
) {
    let token = token as u64;
    let terminal = matches!(kind, KIND_SUCCEEDED | KIND_ERROR);

    let entry = {
        let mut scans = scans().lock().expect("poisoned scan registry");
        if terminal {
            scans.remove(&token)
        } else {
            scans.get(&token).map(|entry| ScanEntry {
                sink: entry.sink.clone(),
                done: Arc::clone(&entry.done),
            })
        }
    };
    let Some(entry) = entry else {
        warn!("fingerprint event for unknown scan token {token}");
        return;
    };

    let text = || -> String {
        env.get_string(&message)
            .map(Into::into)
            .unwrap_or_else(|_| String::new())
    };
    let code = u32::try_from(code).unwrap_or(0);

    let event = match kind {
        KIND_SUCCEEDED => ScanEvent::Succeeded,
        KIND_FAILED => ScanEvent::Failed,
        KIND_ERROR => ScanEvent::Error {
            code,
            message: text(),
        },
        KIND_HELP => ScanEvent::Help {
            code,
            message: text(),
        },
        other => {
            warn!("unknown fingerprint event kind {other}");
            return;
        }
    };

    entry.sink.deliver(event);
    if terminal {
        entry.done.notify_one();
    }
}

/// Fingerprint backend backed by `FingerprintManagerCompat` through the
/// embedded helper.
pub struct AndroidFingerprintBackend {
    vm: Arc<JavaVM>,
    context: GlobalRef,
}

impl fmt::Debug for AndroidFingerprintBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidFingerprintBackend").finish()
    }
}

impl AndroidFingerprintBackend {
    /// Construct the backend from a JNI environment and an Android Context.
    ///
    /// Loads the embedded helper DEX on first use.
    ///
    /// # Errors
    /// Returns [`FingerprintError::Platform`] when the helper cannot be
    /// loaded or registered.
    pub fn new(env: &mut JNIEnv, context: &JObject) -> Result<Self, FingerprintError> {
        init_with_context(env, context)?;
        let vm = env.get_java_vm().map_err(|e| jni_error("get_java_vm", e))?;
        let context = env
            .new_global_ref(context)
            .map_err(|e| jni_error("new_global_ref", e))?;
        Ok(Self {
            vm: Arc::new(vm),
            context,
        })
    }

    fn query(&self, method: &str) -> Result<bool, FingerprintError> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| jni_error("attach_current_thread", e))?;
        let class = helper_class(&mut env)?;
        env.call_static_method(
            &class,
            method,
            "(Landroid/content/Context;)Z",
            &[JValue::Object(self.context.as_obj())],
        )
        .map_err(|e| jni_error(method, e))?
        .z()
        .map_err(|e| jni_error("boolean result", e))
    }
}

impl FingerprintBackend for AndroidFingerprintBackend {
    fn has_hardware(&self) -> bool {
        self.query("hasHardware").unwrap_or_else(|err| {
            error!("hasHardware query failed: {err}");
            false
        })
    }

    fn is_enrolled(&self) -> bool {
        self.query("isEnrolled").unwrap_or_else(|err| {
            error!("isEnrolled query failed: {err}");
            false
        })
    }

    fn authenticate(
        &self,
        _reason: &str,
        events: EventSink,
        cancel: CancellationSignal,
    ) -> Result<(), FingerprintError> {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        let done = Arc::new(Notify::new());
        scans().lock().expect("poisoned scan registry").insert(
            token,
            ScanEntry {
                sink: events,
                done: Arc::clone(&done),
            },
        );

        let started = {
            let mut env = self
                .vm
                .attach_current_thread()
                .map_err(|e| jni_error("attach_current_thread", e))?;
            let class = helper_class(&mut env)?;
            env.call_static_method(
                &class,
                "authenticate",
                "(Landroid/content/Context;J)V",
                &[
                    JValue::Object(self.context.as_obj()),
                    JValue::Long(token as jlong),
                ],
            )
            .map(|_| ())
            .map_err(|e| jni_error("authenticate", e))
        };
        if let Err(err) = started {
            scans().lock().expect("poisoned scan registry").remove(&token);
            return Err(err);
        }

        let vm = Arc::clone(&self.vm);
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => cancel_scan(&vm, token),
                () = done.notified() => {}
            }
        });
        Ok(())
    }
}

fn cancel_scan(vm: &JavaVM, token: u64) {
    let result = vm
        .attach_current_thread()
        .map_err(|e| jni_error("attach_current_thread", e))
        .and_then(|mut env| {
            let class = helper_class(&mut env)?;
            env.call_static_method(&class, "cancel", "(J)V", &[JValue::Long(token as jlong)])
                .map(|_| ())
                .map_err(|e| jni_error("cancel", e))
        });
    if let Err(err) = result {
        error!("cancelling fingerprint scan failed: {err}");
    }
}

/// Placeholder backend used when no JVM context has been provided.
///
/// Apps construct [`AndroidFingerprintBackend`] from their activity context
/// and pass it to
/// [`FingerprintManager::with_backend`](crate::FingerprintManager::with_backend).
#[derive(Debug, Default)]
pub struct DetachedBackend;

impl FingerprintBackend for DetachedBackend {
    fn has_hardware(&self) -> bool {
        false
    }

    fn is_enrolled(&self) -> bool {
        false
    }

    fn authenticate(
        &self,
        _reason: &str,
        _events: EventSink,
        _cancel: CancellationSignal,
    ) -> Result<(), FingerprintError> {
        Err(FingerprintError::Platform(
            "Android requires a backend built from a JNI context".into(),
        ))
    }
}
