//! Live viewer for a spring-mass run
//!
//! The parameter file is watched; every save submits a new simulation
//! request, superseding the run in flight. Frames are read back from the
//! same broadcaster the network transport uses.

use eframe::egui;
use notify::{Event, RecommendedWatcher, Watcher};
use springsim_core::sink::Frame;
use springsim_core::{Broadcaster, Limits, RunConfig, RunManager, SimulationParameters, WireMessage};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{info, warn};

/// Data points kept for the position trace
const TRACE_LEN: usize = 600;

/// Frames buffered between the sampling loop and the UI thread
const VIEW_QUEUE_DEPTH: usize = 256;

/// Context from the latest init message
#[derive(Debug, Clone, Copy)]
struct RunContext {
    mass: f64,
    spring_constant: f64,
    damping: f64,
    max_displacement: f64,
}

pub struct ViewerApp {
    params_path: PathBuf,
    limits: Limits,
    manager: RunManager,
    broadcaster: Arc<Broadcaster>,
    frames: mpsc::Receiver<Frame>,
    context: Option<RunContext>,
    trace: VecDeque<(f64, f64)>,
    last_error: Option<String>,
    #[allow(dead_code)] // Kept alive to maintain file watching
    file_watcher: Option<RecommendedWatcher>,
    file_receiver: mpsc::Receiver<notify::Result<Event>>,
}

impl ViewerApp {
    pub fn new(
        params_path: PathBuf,
        config: RunConfig,
        limits: Limits,
        _cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let broadcaster = Arc::new(Broadcaster::new());
        let (_, frames) = broadcaster.subscribe_channel(VIEW_QUEUE_DEPTH);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .ok();

        if let Some(ref mut w) = watcher {
            if let Err(e) = w.watch(&params_path, notify::RecursiveMode::NonRecursive) {
                warn!("not watching {}: {}", params_path.display(), e);
            }
        }

        let mut app = Self {
            params_path,
            limits,
            manager: RunManager::new(config),
            broadcaster,
            frames,
            context: None,
            trace: VecDeque::with_capacity(TRACE_LEN),
            last_error: None,
            file_watcher: watcher,
            file_receiver: rx,
        };

        app.restart();
        app
    }

    /// Read the parameter file and supersede the active run
    fn restart(&mut self) {
        match load_params(&self.params_path, &self.limits) {
            Ok(params) => {
                let sink = Arc::clone(&self.broadcaster);
                match self.manager.request_simulation(params, self.limits, sink) {
                    Ok(run) => {
                        info!(run = %run, "parameters loaded from {}", self.params_path.display());
                        self.last_error = None;
                    }
                    Err(e) => self.last_error = Some(e.to_string()),
                }
            }
            Err(e) => {
                self.last_error = Some(e);
            }
        }
    }

    fn check_file_changes(&mut self) {
        let mut changed = false;
        while let Ok(event) = self.file_receiver.try_recv() {
            match event {
                Ok(Event {
                    kind: notify::EventKind::Modify(_),
                    paths,
                    ..
                }) => {
                    if paths.iter().any(|p| p.ends_with(&self.params_path) || *p == self.params_path) {
                        changed = true;
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("file watcher error: {}", e),
            }
        }

        if changed {
            self.restart();
        }
    }

    fn drain_frames(&mut self) {
        while let Ok(frame) = self.frames.try_recv() {
            match serde_json::from_str::<WireMessage>(&frame) {
                Ok(WireMessage::Init {
                    mass,
                    spring_constant,
                    damping,
                    max_displacement,
                    ..
                }) => {
                    self.context = Some(RunContext {
                        mass,
                        spring_constant,
                        damping,
                        max_displacement,
                    });
                    self.trace.clear();
                }
                Ok(WireMessage::Data { time, position }) => {
                    if self.trace.len() == TRACE_LEN {
                        self.trace.pop_front();
                    }
                    self.trace.push_back((time, position));
                }
                Err(e) => warn!("unreadable frame: {}", e),
            }
        }
    }

    fn draw_spring(&self, painter: &egui::Painter, rect: egui::Rect, position_cm: f64) {
        let Some(context) = self.context else {
            return;
        };

        // Full scale is the configured maximum displacement, in cm
        let range_cm = (context.max_displacement * 100.0).max(f64::EPSILON);
        let anchor = egui::pos2(rect.left() + 20.0, rect.center().y);
        let equilibrium_x = rect.center().x;
        let half_width = rect.width() * 0.35;
        let offset = (position_cm / range_cm).clamp(-1.0, 1.0) as f32 * half_width;
        let mass_x = equilibrium_x + offset;
        let box_size = 20.0 + 4.0 * context.mass.sqrt() as f32;

        painter.line_segment(
            [
                egui::pos2(anchor.x, rect.top() + 10.0),
                egui::pos2(anchor.x, rect.bottom() - 10.0),
            ],
            egui::Stroke::new(3.0, egui::Color32::GRAY),
        );
        painter.line_segment(
            [
                egui::pos2(equilibrium_x, rect.top() + 10.0),
                egui::pos2(equilibrium_x, rect.bottom() - 10.0),
            ],
            egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
        );

        // Zig-zag coil from the wall to the mass
        let coils = 12;
        let end_x = mass_x - box_size / 2.0;
        let amplitude = 8.0;
        let mut points = vec![anchor];
        for i in 1..coils {
            let x = anchor.x + (end_x - anchor.x) * i as f32 / coils as f32;
            let y = anchor.y + if i % 2 == 0 { amplitude } else { -amplitude };
            points.push(egui::pos2(x, y));
        }
        points.push(egui::pos2(end_x, anchor.y));
        painter.add(egui::Shape::line(
            points,
            egui::Stroke::new(1.5, egui::Color32::LIGHT_GRAY),
        ));

        let mass_rect =
            egui::Rect::from_center_size(egui::pos2(mass_x, anchor.y), egui::vec2(box_size, box_size));
        painter.rect_filled(mass_rect, 2.0, egui::Color32::LIGHT_BLUE);
        painter.rect_stroke(mass_rect, 2.0, egui::Stroke::new(1.0, egui::Color32::BLUE));
    }

    fn draw_trace(&self, painter: &egui::Painter, rect: egui::Rect) {
        let (Some(&(t0, _)), Some(&(t1, _))) = (self.trace.front(), self.trace.back()) else {
            return;
        };
        let range_cm = self
            .context
            .map(|c| c.max_displacement * 100.0)
            .unwrap_or(100.0)
            .max(f64::EPSILON);
        let span = (t1 - t0).max(f64::EPSILON);

        painter.line_segment(
            [
                egui::pos2(rect.left(), rect.center().y),
                egui::pos2(rect.right(), rect.center().y),
            ],
            egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
        );

        let points: Vec<egui::Pos2> = self
            .trace
            .iter()
            .map(|&(t, position)| {
                let x = rect.left() + ((t - t0) / span) as f32 * rect.width();
                let y = rect.center().y
                    - (position / range_cm).clamp(-1.0, 1.0) as f32 * rect.height() * 0.45;
                egui::pos2(x, y)
            })
            .collect();
        painter.add(egui::Shape::line(
            points,
            egui::Stroke::new(1.5, egui::Color32::LIGHT_BLUE),
        ));
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_file_changes();
        self.drain_frames();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("⏮ Restart").clicked() {
                    self.restart();
                }

                if ui.button("⏹ Stop").clicked() {
                    self.manager.cancel();
                }

                ui.separator();

                if let Some(context) = self.context {
                    ui.label(format!(
                        "m = {} kg   k = {} N/m   c = {}",
                        context.mass, context.spring_constant, context.damping
                    ));
                }

                if let Some(&(time, position)) = self.trace.back() {
                    ui.separator();
                    ui.label(format!("t = {:.2} s   x = {:.2} cm", time, position));
                }
            });
        });

        if let Some(ref error) = self.last_error {
            egui::TopBottomPanel::bottom("errors").show(ctx, |ui| {
                ui.set_max_height(100.0);
                ui.label(egui::RichText::new(format!("Error: {}", error)).color(egui::Color32::RED));
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let rect = ui.max_rect();
            let painter = ui.painter();
            let split_y = rect.top() + rect.height() * 0.4;
            let spring_rect = egui::Rect::from_min_max(rect.min, egui::pos2(rect.right(), split_y));
            let trace_rect = egui::Rect::from_min_max(egui::pos2(rect.left(), split_y), rect.max);

            let position = self.trace.back().map(|&(_, p)| p).unwrap_or(0.0);
            self.draw_spring(painter, spring_rect, position);
            self.draw_trace(painter, trace_rect.shrink(10.0));
        });

        ctx.request_repaint_after(self.manager.config().tick_interval);
    }
}

/// Read and validate parameters from a JSON file
fn load_params(path: &Path, limits: &Limits) -> Result<SimulationParameters, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let params: SimulationParameters = serde_json::from_str(&text)
        .map_err(|e| format!("invalid parameter file {}: {}", path.display(), e))?;
    params.validate(limits).map_err(|e| e.to_string())?;
    Ok(params)
}

/// Open the viewer window and block until it is closed
pub fn run_viewer(
    params_path: PathBuf,
    config: RunConfig,
    limits: Limits,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "springsim",
        options,
        Box::new(move |cc| Ok(Box::new(ViewerApp::new(params_path, config, limits, cc)))),
    )?;
    Ok(())
}
