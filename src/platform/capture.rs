//! Region capture of the game window using Windows Graphics Capture.
//!
//! One capture session is kept open for the whole scan. Each grab discards
//! the frame waiting in the pool and waits for a fresh one, so the image
//! always shows the screen after the last pointer move.

use anyhow::{Context, Result, anyhow};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{
    Direct3D11CaptureFramePool, GraphicsCaptureItem, GraphicsCaptureSession,
};
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING, D3D11CreateDevice, ID3D11Device,
    ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
};
use windows::Win32::System::WinRT::Direct3D11::{
    CreateDirect3D11DeviceFromDXGIDevice, IDirect3DDxgiInterfaceAccess,
};
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;
use windows::core::Interface;

use super::window::window_screen_rect;
use crate::scan::ScreenRect;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WindowCapture {
    hwnd: HWND,
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    frame_pool: Direct3D11CaptureFramePool,
    session: GraphicsCaptureSession,
    frame_arrived: Arc<AtomicBool>,
}

impl WindowCapture {
    /// Starts a capture session for the window.
    pub fn new(hwnd: HWND) -> Result<Self> {
        let (device, context) = create_d3d11_device()?;
        let item = create_capture_item(hwnd)?;
        let size = item.Size()?;
        crate::log(&format!("Capture size: {}x{}", size.Width, size.Height));

        let d3d_device = create_direct3d_device(&device)?;
        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            1,
            size,
        )?;
        let session = frame_pool.CreateCaptureSession(&item)?;

        let frame_arrived = Arc::new(AtomicBool::new(false));
        let frame_arrived_clone = frame_arrived.clone();
        frame_pool.FrameArrived(&TypedEventHandler::new(
            move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
                frame_arrived_clone.store(true, Ordering::SeqCst);
                Ok(())
            },
        ))?;

        session.StartCapture()?;

        Ok(Self {
            hwnd,
            device,
            context,
            frame_pool,
            session,
            frame_arrived,
        })
    }

    /// Captures `rect` (screen coordinates) from the window.
    pub fn grab(&mut self, rect: ScreenRect) -> Result<RgbaImage> {
        // Drop the buffered frame so the next one is newer than the request
        self.frame_arrived.store(false, Ordering::SeqCst);
        if let Ok(stale) = self.frame_pool.TryGetNextFrame() {
            let _ = stale.Close();
        }

        let start = Instant::now();
        let frame = loop {
            if self.frame_arrived.load(Ordering::SeqCst) {
                if let Ok(frame) = self.frame_pool.TryGetNextFrame() {
                    break frame;
                }
            }
            if start.elapsed() > FRAME_TIMEOUT {
                return Err(anyhow!("Timeout waiting for frame"));
            }
            std::thread::sleep(Duration::from_millis(5));
        };

        let surface = frame.Surface()?;
        let access: IDirect3DDxgiInterfaceAccess = surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        let window = window_screen_rect(self.hwnd)?;
        let image = self.read_region(&texture, rect.left - window.left, rect.top - window.top, rect);
        let _ = frame.Close();
        image
    }

    /// Copies the texture to a staging texture and crops the region,
    /// converting BGRA to RGBA. Pixels outside the texture stay transparent.
    fn read_region(
        &self,
        texture: &ID3D11Texture2D,
        crop_x: i32,
        crop_y: i32,
        rect: ScreenRect,
    ) -> Result<RgbaImage> {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };

        let staging_texture = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            self.device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("Failed to create staging texture"))?
        };
        let staging_resource = staging_texture.cast::<ID3D11Resource>()?;

        unsafe {
            self.context
                .CopyResource(&staging_resource, &texture.cast::<ID3D11Resource>()?);
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            self.context
                .Map(&staging_resource, 0, D3D11_MAP_READ, 0, Some(&mut mapped))?;
            mapped
        };

        let width = rect.width.max(0) as u32;
        let height = rect.height.max(0) as u32;
        let mut img = RgbaImage::new(width, height);

        let src_data = unsafe {
            std::slice::from_raw_parts(
                mapped.pData as *const u8,
                (mapped.RowPitch * desc.Height) as usize,
            )
        };
        let row_pitch = mapped.RowPitch as usize;

        for y in 0..height {
            let src_y = crop_y + y as i32;
            if src_y < 0 || src_y >= desc.Height as i32 {
                continue;
            }
            for x in 0..width {
                let src_x = crop_x + x as i32;
                if src_x < 0 || src_x >= desc.Width as i32 {
                    continue;
                }
                let offset = src_y as usize * row_pitch + src_x as usize * 4;
                // BGRA -> RGBA
                let b = src_data[offset];
                let g = src_data[offset + 1];
                let r = src_data[offset + 2];
                let a = src_data[offset + 3];
                img.put_pixel(x, y, Rgba([r, g, b, a]));
            }
        }

        unsafe {
            self.context.Unmap(&staging_resource, 0);
        }

        Ok(img)
    }
}

impl Drop for WindowCapture {
    fn drop(&mut self) {
        let _ = self.session.Close();
        let _ = self.frame_pool.Close();
    }
}

fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("Failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("Failed to create D3D11 context"))?,
    ))
}

/// WinRT device wrapper required by the capture API.
fn create_direct3d_device(
    device: &ID3D11Device,
) -> Result<windows::Graphics::DirectX::Direct3D11::IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("Failed to cast to IDirect3DDevice")
}

fn create_capture_item(hwnd: HWND) -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("Failed to get IGraphicsCaptureItemInterop")?
    };
    unsafe {
        interop
            .CreateForWindow(hwnd)
            .context("Failed to create capture item for window")
    }
}
